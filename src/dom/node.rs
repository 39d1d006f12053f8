//! Node tree - elements, text, attributes and live properties.

use std::cell::{Cell, RefCell};

use super::event::ListenerEntry;

/// Handle to a node in a [`Document`]. Copyable; stays valid for the
/// document's lifetime, attached or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

pub(crate) enum NodeKind {
    Element(ElementData),
    Text(String),
}

pub(crate) struct ElementData {
    /// Lower-case tag name.
    pub(crate) tag: String,
    /// Attributes in source order. Names are lower-case.
    pub(crate) attributes: Vec<(String, String)>,
    /// Value property once written (form controls).
    pub(crate) value: Option<String>,
    /// Checkedness once written (checkbox/radio).
    pub(crate) checked: Option<bool>,
}

pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

// =============================================================================
// Document
// =============================================================================

/// Retained document: the rendering surface bindings write to.
///
/// All methods take `&self`; state lives behind `RefCell`s and no borrow is
/// held while user callbacks run, so listeners may freely mutate the tree.
pub struct Document {
    pub(crate) nodes: RefCell<Vec<NodeData>>,
    pub(crate) listeners: RefCell<Vec<ListenerEntry>>,
    pub(crate) next_listener: Cell<u64>,
    root: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing `<html><body></body></html>`.
    pub fn new() -> Self {
        let doc = Self {
            nodes: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            root: NodeId(0),
            body: NodeId(1),
        };
        let root = doc.create_element("html");
        let body = doc.create_element("body");
        doc.append_child(root, body);
        doc
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element.
    pub fn body(&self) -> NodeId {
        self.body
    }

    // =========================================================================
    // Creation and structure
    // =========================================================================

    fn push(&self, kind: NodeKind) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(nodes.len() - 1)
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            value: None,
            checked: None,
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Append `child` to `parent`, moving it out of its current parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        if self.contains(child, parent) {
            tracing::debug!(?parent, ?child, "refusing to append an ancestor into its descendant");
            return;
        }
        self.detach(child);
        let mut nodes = self.nodes.borrow_mut();
        nodes[child.0].parent = Some(parent);
        nodes[parent.0].children.push(child);
    }

    /// Remove `node` from its parent. The node stays usable.
    pub fn detach(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node.0].parent.take() {
            nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    /// Remove `child` from `parent`. No-op if it is not a child of `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) {
        if self.parent(child) == Some(parent) {
            self.detach(child);
        }
    }

    /// Detach every child of `node`.
    pub fn clear_children(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let children = std::mem::take(&mut nodes[node.0].children);
        for child in children {
            nodes[child.0].parent = None;
        }
    }

    /// Parent node, if attached.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow()[node.0].parent
    }

    /// Child nodes in order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes.borrow()[node.0].children.clone()
    }

    /// Element children in order.
    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Ancestors from the parent outwards.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut current = nodes[node.0].parent;
        while let Some(parent) = current {
            out.push(parent);
            current = nodes[parent.0].parent;
        }
        out
    }

    /// Inclusive containment: `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    /// True if `node` is attached under the document element.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// `root` and all its descendants, pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(nodes[node.0].children.iter().rev());
        }
        out
    }

    /// `root` and every element beneath it, pre-order.
    pub fn walk_elements(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|node| self.is_element(*node))
            .collect()
    }

    // =========================================================================
    // Element basics
    // =========================================================================

    pub(crate) fn with_element<R>(&self, node: NodeId, f: impl FnOnce(&ElementData) -> R) -> Option<R> {
        match &self.nodes.borrow()[node.0].kind {
            NodeKind::Element(data) => Some(f(data)),
            NodeKind::Text(_) => None,
        }
    }

    pub(crate) fn with_element_mut<R>(
        &self,
        node: NodeId,
        f: impl FnOnce(&mut ElementData) -> R,
    ) -> Option<R> {
        match &mut self.nodes.borrow_mut()[node.0].kind {
            NodeKind::Element(data) => Some(f(data)),
            NodeKind::Text(_) => None,
        }
    }

    /// True for element nodes.
    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes.borrow()[node.0].kind, NodeKind::Element(_))
    }

    /// Upper-case tag name (`"DIV"`); empty for text nodes.
    pub fn tag_name(&self, node: NodeId) -> String {
        self.with_element(node, |el| el.tag.to_ascii_uppercase())
            .unwrap_or_default()
    }

    /// Lower-case tag name (`"div"`); empty for text nodes.
    pub fn local_name(&self, node: NodeId) -> String {
        self.with_element(node, |el| el.tag.clone()).unwrap_or_default()
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.with_element(node, |el| {
            el.attributes
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
        })
        .flatten()
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.get_attribute(node, name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        self.with_element_mut(node, |el| {
            match el.attributes.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => el.attributes.push((name, value.to_string())),
            }
        });
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        self.with_element_mut(node, |el| el.attributes.retain(|(n, _)| *n != name));
    }

    /// Snapshot of all attributes in order.
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.with_element(node, |el| el.attributes.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match &nodes[current.0].kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element(_) => stack.extend(nodes[current.0].children.iter().rev()),
            }
        }
        out
    }

    /// Replace all children with a single text node (none if `text` is empty).
    pub fn set_text_content(&self, node: NodeId, text: &str) {
        let is_text = {
            let mut nodes = self.nodes.borrow_mut();
            match &mut nodes[node.0].kind {
                NodeKind::Text(existing) => {
                    *existing = text.to_string();
                    true
                }
                NodeKind::Element(_) => false,
            }
        };
        if is_text {
            return;
        }
        self.clear_children(node);
        if !text.is_empty() {
            let child = self.create_text(text);
            self.append_child(node, child);
        }
    }

    // =========================================================================
    // Form control properties
    // =========================================================================

    /// Lower-case `type` of an input; `"text"` when absent.
    pub fn input_type(&self, node: NodeId) -> String {
        self.get_attribute(node, "type")
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string())
    }

    /// Current value property.
    ///
    /// Inputs fall back to their `value` attribute until written, textareas
    /// to their text, selects to the selected (or first) option.
    pub fn value(&self, node: NodeId) -> String {
        match self.local_name(node).as_str() {
            "select" => self.select_value(node),
            "textarea" => self
                .with_element(node, |el| el.value.clone())
                .flatten()
                .unwrap_or_else(|| self.text_content(node)),
            "option" => self
                .get_attribute(node, "value")
                .unwrap_or_else(|| self.text_content(node).trim().to_string()),
            _ => self
                .with_element(node, |el| el.value.clone())
                .flatten()
                .or_else(|| self.get_attribute(node, "value"))
                .unwrap_or_default(),
        }
    }

    /// Write the value property.
    pub fn set_value(&self, node: NodeId, value: &str) {
        self.with_element_mut(node, |el| el.value = Some(value.to_string()));
    }

    fn select_value(&self, node: NodeId) -> String {
        let options: Vec<NodeId> = self
            .walk_elements(node)
            .into_iter()
            .filter(|n| self.local_name(*n) == "option")
            .collect();
        let values: Vec<String> = options.iter().map(|o| self.value(*o)).collect();

        if let Some(chosen) = self.with_element(node, |el| el.value.clone()).flatten() {
            // A value with no matching option selects nothing.
            return if values.contains(&chosen) { chosen } else { String::new() };
        }
        options
            .iter()
            .position(|o| self.has_attribute(*o, "selected"))
            .and_then(|i| values.get(i).cloned())
            .or_else(|| values.first().cloned())
            .unwrap_or_default()
    }

    /// Current checkedness. Falls back to the `checked` attribute until written.
    pub fn checked(&self, node: NodeId) -> bool {
        self.with_element(node, |el| el.checked)
            .flatten()
            .unwrap_or_else(|| self.has_attribute(node, "checked"))
    }

    pub fn set_checked(&self, node: NodeId, checked: bool) {
        self.with_element_mut(node, |el| el.checked = Some(checked));
    }

    // =========================================================================
    // Inline style (display only)
    // =========================================================================

    fn style_declarations(&self, node: NodeId) -> Vec<(String, String)> {
        self.get_attribute(node, "style")
            .unwrap_or_default()
            .split(';')
            .filter_map(|decl| {
                let (prop, value) = decl.split_once(':')?;
                let prop = prop.trim().to_ascii_lowercase();
                (!prop.is_empty()).then(|| (prop, value.trim().to_string()))
            })
            .collect()
    }

    /// Inline `display` value, empty when unset.
    pub fn display(&self, node: NodeId) -> String {
        self.style_declarations(node)
            .into_iter()
            .find(|(prop, _)| prop == "display")
            .map(|(_, value)| value)
            .unwrap_or_default()
    }

    /// Set the inline `display` value. Empty removes the declaration.
    pub fn set_display(&self, node: NodeId, display: &str) {
        let mut declarations: Vec<(String, String)> = self
            .style_declarations(node)
            .into_iter()
            .filter(|(prop, _)| prop != "display")
            .collect();
        if !display.is_empty() {
            declarations.push(("display".to_string(), display.to_string()));
        }
        if declarations.is_empty() {
            self.remove_attribute(node, "style");
        } else {
            let style = declarations
                .iter()
                .map(|(prop, value)| format!("{}: {};", prop, value))
                .collect::<Vec<_>>()
                .join(" ");
            self.set_attribute(node, "style", &style);
        }
    }

    // =========================================================================
    // Classes
    // =========================================================================

    /// The `class` attribute, empty when absent.
    pub fn class_name(&self, node: NodeId) -> String {
        self.get_attribute(node, "class").unwrap_or_default()
    }

    pub fn set_class_name(&self, node: NodeId, class_name: &str) {
        self.set_attribute(node, "class", class_name);
    }

    /// Class tokens in order, without duplicates.
    pub fn class_list(&self, node: NodeId) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        for token in self.class_name(node).split_whitespace() {
            if !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
        tokens
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_list(node).iter().any(|t| t == class)
    }

    pub fn add_class(&self, node: NodeId, class: &str) {
        let mut tokens = self.class_list(node);
        if !tokens.iter().any(|t| t == class) {
            tokens.push(class.to_string());
            self.set_class_name(node, &tokens.join(" "));
        }
    }

    pub fn remove_class(&self, node: NodeId, class: &str) {
        let tokens = self.class_list(node);
        if tokens.iter().any(|t| t == class) {
            let kept: Vec<String> = tokens.into_iter().filter(|t| t != class).collect();
            self.set_class_name(node, &kept.join(" "));
        }
    }
}
