//! `:name` directives - one compiled expression driving one DOM mutation.

use crate::config::BindConfig;
use crate::dom::{Document, NodeId};
use crate::error::BindError;
use crate::expr::{Expression, Scope};
use crate::types::Value;

use super::class_list;
use super::model::ModelKind;

/// Attributes set present/absent rather than to a string.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "selected",
];

/// What a directive does with its value.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    Text,
    /// Raw markup, parsed into child nodes.
    Html,
    Value,
    /// `display` restores to the inline value seen at bind time.
    Show { display: String },
    /// `base` is the class list seen at bind time.
    Class { base: Vec<String> },
    /// `key` is the state key written back by the control.
    Model { kind: ModelKind, key: String },
    BooleanAttribute(String),
    Attribute(String),
}

impl DirectiveKind {
    fn resolve(doc: &Document, node: NodeId, name: &str, expression: &Expression) -> Result<Self, BindError> {
        let kind = match name {
            "text" => DirectiveKind::Text,
            "html" => DirectiveKind::Html,
            "value" => DirectiveKind::Value,
            "show" => DirectiveKind::Show {
                display: doc.display(node),
            },
            "class" => DirectiveKind::Class {
                base: doc.class_list(node),
            },
            "model" => {
                let key = expression
                    .as_identifier()
                    .ok_or_else(|| BindError::ModelTarget(expression.source().to_string()))?;
                DirectiveKind::Model {
                    kind: ModelKind::classify(doc, node),
                    key: key.to_string(),
                }
            }
            other if BOOLEAN_ATTRIBUTES.contains(&other) => DirectiveKind::BooleanAttribute(other.to_string()),
            other => DirectiveKind::Attribute(other.to_string()),
        };
        Ok(kind)
    }
}

/// A compiled directive bound to one node.
#[derive(Debug, Clone)]
pub struct Directive {
    node: NodeId,
    kind: DirectiveKind,
    expression: Expression,
}

impl Directive {
    /// Compile `source` for `:name` on `node`.
    ///
    /// Captures whatever the directive needs to restore later (inline
    /// display, pre-bind classes) from the node as it is now.
    pub fn bind(doc: &Document, node: NodeId, name: &str, source: &str) -> Result<Self, BindError> {
        let expression = Expression::compile(source).map_err(|error| BindError::Compile {
            source_text: source.to_string(),
            error,
        })?;
        let kind = DirectiveKind::resolve(doc, node, name, &expression)?;
        Ok(Self { node, kind, expression })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> &DirectiveKind {
        &self.kind
    }

    pub fn source(&self) -> &str {
        self.expression.source()
    }

    /// Evaluate against `scope` and write the result into the node.
    ///
    /// An evaluation failure is logged and leaves the node untouched.
    pub fn apply(&self, doc: &Document, scope: &dyn Scope, config: &BindConfig) {
        let value = match self.expression.evaluate(scope) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(
                    source = self.expression.source(),
                    directive = ?self.kind,
                    %error,
                    "directive evaluation failed"
                );
                return;
            }
        };
        tracing::trace!(node = ?self.node, directive = ?self.kind, %value, "apply");
        self.write(doc, &value, config);
    }

    fn write(&self, doc: &Document, value: &Value, config: &BindConfig) {
        let node = self.node;
        match &self.kind {
            DirectiveKind::Text => doc.set_text_content(node, &text_of(value)),
            DirectiveKind::Html => doc.set_inner_html(node, &text_of(value)),
            DirectiveKind::Value => doc.set_value(node, &text_of(value)),
            DirectiveKind::Show { display } => {
                let display = if value.is_truthy() { display.as_str() } else { config.hidden_display.as_str() };
                doc.set_display(node, display);
            }
            DirectiveKind::Class { base } => {
                let classes = class_list::combine(base, value);
                if classes.is_empty() && !doc.has_attribute(node, "class") {
                    return;
                }
                doc.set_class_name(node, &classes.join(" "));
            }
            DirectiveKind::Model { kind, .. } => kind.apply(doc, node, value),
            DirectiveKind::BooleanAttribute(name) => {
                if value.is_truthy() {
                    doc.set_attribute(node, name, "");
                } else {
                    doc.remove_attribute(node, name);
                }
            }
            DirectiveKind::Attribute(name) => doc.set_attribute(node, name, &value.to_string()),
        }
    }
}

/// String form for text-like sinks; nullish becomes empty.
fn text_of(value: &Value) -> String {
    if value.is_nullish() {
        String::new()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ValueScope;

    fn element(doc: &Document, html: &str) -> NodeId {
        doc.append_html(doc.body(), html)[0]
    }

    fn scope() -> ValueScope {
        ValueScope::new(Value::from_pairs([
            ("count", Value::from(3)),
            ("open", Value::from(false)),
            ("label", Value::from("<b>hi</b>")),
            ("missing", Value::Null),
        ]))
    }

    fn run(doc: &Document, node: NodeId, name: &str, source: &str) -> Directive {
        let directive = Directive::bind(doc, node, name, source).unwrap();
        directive.apply(doc, &scope(), &BindConfig::default());
        directive
    }

    #[test]
    fn test_text_and_html() {
        let doc = Document::new();
        let p = element(&doc, "<p>old</p>");
        run(&doc, p, "text", "count + 1");
        assert_eq!(doc.text_content(p), "4");
        run(&doc, p, "text", "label");
        assert_eq!(doc.inner_html(p), "&lt;b&gt;hi&lt;/b&gt;");
        run(&doc, p, "html", "label");
        assert_eq!(doc.inner_html(p), "<b>hi</b>");
        run(&doc, p, "text", "missing");
        assert_eq!(doc.text_content(p), "");
    }

    #[test]
    fn test_show_restores_original_display() {
        let doc = Document::new();
        let div = element(&doc, r#"<div style="display: flex"></div>"#);
        let directive = run(&doc, div, "show", "open");
        assert_eq!(doc.display(div), "none");
        directive.apply(&doc, &ValueScope::new(Value::from_pairs([("open", true)])), &BindConfig::default());
        assert_eq!(doc.display(div), "flex");
    }

    #[test]
    fn test_boolean_and_plain_attributes() {
        let doc = Document::new();
        let button = element(&doc, "<button disabled></button>");
        run(&doc, button, "disabled", "open");
        assert!(!doc.has_attribute(button, "disabled"));
        run(&doc, button, "hidden", "count > 1");
        assert_eq!(doc.get_attribute(button, "hidden").as_deref(), Some(""));
        run(&doc, button, "aria-label", "'Count ' + count");
        assert_eq!(doc.get_attribute(button, "aria-label").as_deref(), Some("Count 3"));
    }

    #[test]
    fn test_class_merges_with_base() {
        let doc = Document::new();
        let div = element(&doc, r#"<div class="foo bar"></div>"#);
        run(&doc, div, "class", "{active: count > 0, hidden: open}");
        assert_eq!(doc.class_name(div), "foo bar active");
    }

    #[test]
    fn test_failed_evaluation_leaves_node() {
        let doc = Document::new();
        let p = element(&doc, "<p>keep</p>");
        run(&doc, p, "text", "nope.deeper");
        assert_eq!(doc.text_content(p), "keep");
    }

    #[test]
    fn test_bind_errors() {
        let doc = Document::new();
        let input = element(&doc, "<input>");
        assert!(matches!(
            Directive::bind(&doc, input, "text", "count +"),
            Err(BindError::Compile { .. })
        ));
        assert!(matches!(
            Directive::bind(&doc, input, "model", "a.b"),
            Err(BindError::ModelTarget(_))
        ));
    }
}
