//! Selectors - the subset components use to find their elements.
//!
//! Supported: type (`div`, `*`), `#id`, `.class`, `[attr]`, `[attr=value]`,
//! descendant (` `) and child (`>`) combinators, and comma-separated lists.

use super::node::{Document, NodeId};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

/// One complex selector stored right-to-left: the subject compound first,
/// each following entry joined to the previous one by its combinator.
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    subject: Compound,
    ancestors: Vec<(Combinator, Compound)>,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_')
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let chars: Vec<(usize, char)> = source.char_indices().collect();
        let mut i = 0;
        let offset = |i: usize| chars.get(i).map_or(source.len(), |(o, _)| *o);

        let ident = |i: &mut usize| -> String {
            let mut out = String::new();
            while let Some((_, c)) = chars.get(*i) {
                if !is_ident_char(*c) {
                    break;
                }
                out.push(*c);
                *i += 1;
            }
            out
        };

        let mut alternatives = Vec::new();
        let mut compounds: Vec<Compound> = Vec::new();
        let mut combinators: Vec<Combinator> = Vec::new();
        let mut pending: Option<Combinator> = None;

        loop {
            while chars.get(i).is_some_and(|(_, c)| c.is_whitespace()) {
                i += 1;
                if !compounds.is_empty() && pending.is_none() {
                    pending = Some(Combinator::Descendant);
                }
            }
            let Some(&(_, c)) = chars.get(i) else { break };

            if c == ',' {
                i += 1;
                let complex = finish(&mut compounds, &mut combinators, pending.take())
                    .ok_or_else(|| ParseError::new("empty selector in list", offset(i - 1)))?;
                alternatives.push(complex);
                continue;
            }
            if c == '>' {
                if compounds.is_empty() {
                    return Err(ParseError::new("combinator without a left side", offset(i)));
                }
                i += 1;
                pending = Some(Combinator::Child);
                continue;
            }

            let mut compound = Compound::default();
            if c == '*' {
                i += 1;
            } else if is_ident_char(c) {
                compound.tag = Some(ident(&mut i).to_ascii_lowercase());
            }
            while let Some(&(_, c)) = chars.get(i) {
                match c {
                    '#' | '.' => {
                        i += 1;
                        let name = ident(&mut i);
                        if name.is_empty() {
                            return Err(ParseError::new("expected a name", offset(i)));
                        }
                        compound.conditions.push(if c == '#' {
                            Condition::Id(name)
                        } else {
                            Condition::Class(name)
                        });
                    }
                    '[' => {
                        i += 1;
                        let close = chars[i..]
                            .iter()
                            .position(|(_, c)| *c == ']')
                            .ok_or_else(|| ParseError::new("unterminated attribute selector", offset(i)))?;
                        let body: String = chars[i..i + close].iter().map(|(_, c)| *c).collect();
                        i += close + 1;
                        let (name, value) = match body.split_once('=') {
                            Some((name, value)) => {
                                let value = value.trim();
                                let unquoted = value
                                    .strip_prefix('"')
                                    .and_then(|v| v.strip_suffix('"'))
                                    .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                                    .unwrap_or(value);
                                (name.trim().to_string(), Some(unquoted.to_string()))
                            }
                            None => (body.trim().to_string(), None),
                        };
                        if name.is_empty() {
                            return Err(ParseError::new("expected an attribute name", offset(i)));
                        }
                        compound.conditions.push(Condition::Attribute {
                            name: name.to_ascii_lowercase(),
                            value,
                        });
                    }
                    _ => break,
                }
            }
            if compound == Compound::default() && c != '*' {
                return Err(ParseError::new(format!("unexpected '{}'", c), offset(i)));
            }
            if !compounds.is_empty() {
                combinators.push(pending.take().unwrap_or(Combinator::Descendant));
            }
            pending = None;
            compounds.push(compound);
        }

        let last = finish(&mut compounds, &mut combinators, pending)
            .ok_or_else(|| ParseError::new("empty selector", source.len()))?;
        alternatives.push(last);
        Ok(Self { alternatives })
    }
}

/// Close off one complex selector. `None` if it is empty or dangles a combinator.
fn finish(
    compounds: &mut Vec<Compound>,
    combinators: &mut Vec<Combinator>,
    pending: Option<Combinator>,
) -> Option<Complex> {
    if pending == Some(Combinator::Child) {
        return None;
    }
    let mut compounds = std::mem::take(compounds);
    let mut combinators = std::mem::take(combinators);
    let subject = compounds.pop()?;
    let mut ancestors = Vec::new();
    while let Some(compound) = compounds.pop() {
        let combinator = combinators.pop().unwrap_or(Combinator::Descendant);
        ancestors.push((combinator, compound));
    }
    Some(Complex { subject, ancestors })
}

// =============================================================================
// Matching
// =============================================================================

impl Document {
    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        if !self.is_element(node) {
            return false;
        }
        if let Some(tag) = &compound.tag {
            if self.local_name(node) != *tag {
                return false;
            }
        }
        compound.conditions.iter().all(|condition| match condition {
            Condition::Id(id) => self.get_attribute(node, "id").as_deref() == Some(id.as_str()),
            Condition::Class(class) => self.has_class(node, class),
            Condition::Attribute { name, value } => match (self.get_attribute(node, name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == *expected,
                (None, _) => false,
            },
        })
    }

    fn matches_ancestors(&self, node: NodeId, rest: &[(Combinator, Compound)]) -> bool {
        let Some(((combinator, compound), rest)) = rest.split_first() else {
            return true;
        };
        let mut current = self.parent(node);
        while let Some(candidate) = current {
            if self.matches_compound(candidate, compound) && self.matches_ancestors(candidate, rest) {
                return true;
            }
            if *combinator == Combinator::Child {
                return false;
            }
            current = self.parent(candidate);
        }
        false
    }

    /// True if `node` matches `selector`.
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.alternatives.iter().any(|complex| {
            self.matches_compound(node, &complex.subject)
                && self.matches_ancestors(node, &complex.ancestors)
        })
    }

    /// First descendant of `root` (excluding `root`) matching `selector`, in document order.
    pub fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>, ParseError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .walk_elements(root)
            .into_iter()
            .skip(1)
            .find(|node| self.matches(*node, &selector)))
    }

    /// All descendants of `root` (excluding `root`) matching `selector`, in document order.
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, ParseError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .walk_elements(root)
            .into_iter()
            .skip(1)
            .filter(|node| self.matches(*node, &selector))
            .collect())
    }

    /// Nearest inclusive ancestor of `node` matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|candidate| self.matches(*candidate, selector))
    }
}
