//! Markup - a forgiving HTML fragment parser and serializer.
//!
//! Handles what templates contain in practice: nested elements, quoted and
//! bare attribute values, void elements, comments, raw-text elements and
//! the common character references. It does not build implied `<tbody>`s
//! or perform the full adoption-agency dance.

use super::node::{Document, NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// Elements closed implicitly when a sibling of the same kind opens.
const SELF_CLOSING_SIBLINGS: &[&str] = &["li", "option", "p"];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

// =============================================================================
// Character references
// =============================================================================

pub(crate) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let name = &rest[1..end];
            let c = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\u{a0}', "&nbsp;")
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\u{a0}', "&nbsp;")
}

// =============================================================================
// Parser
// =============================================================================

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Advance past `needle`, or to the end if it never appears.
    fn skip_past(&mut self, needle: &str) -> &'a str {
        let rest = self.rest();
        match rest.find(needle) {
            Some(i) => {
                self.pos += i + needle.len();
                &rest[..i]
            }
            None => {
                self.pos = self.src.len();
                rest
            }
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.bump();
        }
        &self.src[start..self.pos]
    }
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '>' | '/' | '=' | '<' | '"' | '\'')
}

struct OpenTag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

fn parse_open_tag(cursor: &mut Cursor<'_>) -> OpenTag {
    let name = cursor.take_while(is_name_char).to_ascii_lowercase();
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;
    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => break,
            Some('>') => {
                cursor.bump();
                break;
            }
            Some('/') => {
                cursor.bump();
                if cursor.peek() == Some('>') {
                    cursor.bump();
                    self_closing = true;
                    break;
                }
            }
            Some(_) => {
                let attr = cursor.take_while(is_name_char).to_ascii_lowercase();
                if attr.is_empty() {
                    // Stray quote or '='; drop it.
                    cursor.bump();
                    continue;
                }
                cursor.skip_whitespace();
                let value = if cursor.peek() == Some('=') {
                    cursor.bump();
                    cursor.skip_whitespace();
                    match cursor.peek() {
                        Some(q @ ('"' | '\'')) => {
                            cursor.bump();
                            let raw = cursor.skip_past(if q == '"' { "\"" } else { "'" });
                            decode_entities(raw)
                        }
                        _ => decode_entities(cursor.take_while(|c| !c.is_whitespace() && c != '>')),
                    }
                } else {
                    String::new()
                };
                if !attributes.iter().any(|(n, _)| *n == attr) {
                    attributes.push((attr, value));
                }
            }
        }
    }
    OpenTag {
        name,
        attributes,
        self_closing,
    }
}

impl Document {
    /// Parse `html` and append the resulting nodes to `parent`.
    ///
    /// Returns the top-level nodes created.
    pub fn append_html(&self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let mut cursor = Cursor { src: html, pos: 0 };
        let mut stack: Vec<(NodeId, String)> = vec![(parent, String::new())];
        let mut top_level = Vec::new();

        let mut attach = |doc: &Document, stack: &[(NodeId, String)], node: NodeId| {
            let (current, _) = &stack[stack.len() - 1];
            doc.append_child(*current, node);
            if stack.len() == 1 {
                top_level.push(node);
            }
        };

        while !cursor.eof() {
            let rest = cursor.rest();
            if rest.starts_with("<!--") {
                cursor.pos += 4;
                cursor.skip_past("-->");
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                cursor.skip_past(">");
            } else if rest.starts_with("</") {
                cursor.pos += 2;
                let name = cursor.take_while(is_name_char).to_ascii_lowercase();
                cursor.skip_past(">");
                if let Some(depth) = stack.iter().rposition(|(_, tag)| *tag == name) {
                    if depth > 0 {
                        stack.truncate(depth);
                    }
                }
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                cursor.bump();
                let tag = parse_open_tag(&mut cursor);
                if SELF_CLOSING_SIBLINGS.contains(&tag.name.as_str())
                    && stack.len() > 1
                    && stack[stack.len() - 1].1 == tag.name
                {
                    stack.pop();
                }
                let element = self.create_element(&tag.name);
                for (name, value) in &tag.attributes {
                    self.set_attribute(element, name, value);
                }
                attach(self, &stack, element);

                if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) && !tag.self_closing {
                    let close = format!("</{}", tag.name);
                    let body = cursor.skip_past(&close);
                    cursor.skip_past(">");
                    if !body.is_empty() {
                        let text = if tag.name == "textarea" {
                            decode_entities(body)
                        } else {
                            body.to_string()
                        };
                        let child = self.create_text(&text);
                        self.append_child(element, child);
                    }
                } else if !tag.self_closing && !is_void(&tag.name) {
                    stack.push((element, tag.name));
                }
            } else {
                let start = cursor.pos;
                cursor.bump();
                let end = cursor.rest().find('<').map_or(html.len(), |i| cursor.pos + i);
                cursor.pos = end;
                let text = decode_entities(&html[start..end]);
                let node = self.create_text(&text);
                attach(self, &stack, node);
            }
        }
        top_level
    }

    /// Parse `html` into detached top-level nodes.
    pub fn parse_fragment(&self, html: &str) -> Vec<NodeId> {
        let holder = self.create_element("template");
        let nodes = self.append_html(holder, html);
        self.clear_children(holder);
        nodes
    }

    /// Replace the children of `node` with parsed `html`.
    pub fn set_inner_html(&self, node: NodeId, html: &str) {
        self.clear_children(node);
        self.append_html(node, html);
    }

    /// Serialized children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let raw = RAW_TEXT_ELEMENTS.contains(&self.local_name(node).as_str());
        let mut out = String::new();
        for child in self.children(node) {
            if raw && !self.is_element(child) {
                out.push_str(&self.text_content(child));
            } else {
                self.serialize_into(child, &mut out);
            }
        }
        out
    }

    /// Serialized `node` including its own tag.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(node, &mut out);
        out
    }

    fn serialize_into(&self, node: NodeId, out: &mut String) {
        let element = {
            let nodes = self.nodes.borrow();
            match &nodes[node.0].kind {
                NodeKind::Text(text) => {
                    out.push_str(&escape_text(text));
                    None
                }
                NodeKind::Element(data) => Some((data.tag.clone(), data.attributes.clone())),
            }
        };
        let Some((tag, attributes)) = element else {
            return;
        };
        out.push('<');
        out.push_str(&tag);
        for (name, value) in attributes {
            out.push(' ');
            out.push_str(&name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(&value));
            out.push('"');
        }
        out.push('>');
        if is_void(&tag) {
            return;
        }
        out.push_str(&self.inner_html(node));
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
}
