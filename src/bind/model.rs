//! Two-way `:model` bindings.

use std::rc::{Rc, Weak};

use crate::dom::{AbortSignal, Document, Event, ListenerOptions, NodeId};
use crate::state::ReactiveState;
use crate::types::Value;

/// How a form control exchanges its value with state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// `checked` ↔ boolean.
    Checkbox,
    /// `checked` when the control's value equals the state value's string form.
    Radio,
    /// `number` and `range` inputs; writes back numbers.
    Number,
    /// `<select>`; writes back on `change`.
    Select,
    /// Everything else; writes back the raw string on `input`.
    Text,
}

impl ModelKind {
    /// Classify a control by tag and `type`.
    pub fn classify(doc: &Document, node: NodeId) -> Self {
        if doc.local_name(node) == "select" {
            return ModelKind::Select;
        }
        match doc.input_type(node).as_str() {
            "checkbox" => ModelKind::Checkbox,
            "radio" => ModelKind::Radio,
            "number" | "range" => ModelKind::Number,
            _ => ModelKind::Text,
        }
    }

    /// Events that write the control back into state.
    pub fn events(self) -> &'static [&'static str] {
        match self {
            ModelKind::Checkbox | ModelKind::Radio | ModelKind::Select => &["change"],
            ModelKind::Number => &["input", "change"],
            ModelKind::Text => &["input"],
        }
    }

    /// Push a state value into the control.
    pub fn apply(self, doc: &Document, node: NodeId, value: &Value) {
        match self {
            ModelKind::Checkbox => doc.set_checked(node, value.is_truthy()),
            ModelKind::Radio => doc.set_checked(node, doc.value(node) == value.to_string()),
            _ => {
                let text = if value.is_nullish() { String::new() } else { value.to_string() };
                doc.set_value(node, &text);
            }
        }
    }

    /// Read the control as a state value.
    pub fn read(self, doc: &Document, node: NodeId) -> Value {
        match self {
            ModelKind::Checkbox => Value::Bool(doc.checked(node)),
            ModelKind::Number => Value::Number(Value::String(doc.value(node)).to_number()),
            _ => Value::String(doc.value(node)),
        }
    }
}

/// Register the write-back listeners for `node`, all under `signal`.
///
/// Listeners hold the document weakly so a document never keeps itself alive.
pub fn listen(
    doc: &Rc<Document>,
    node: NodeId,
    kind: ModelKind,
    key: &str,
    state: &ReactiveState,
    signal: &AbortSignal,
) {
    for event in kind.events() {
        let weak: Weak<Document> = Rc::downgrade(doc);
        let state = state.clone();
        let key = key.to_string();
        doc.add_event_listener(
            node,
            event,
            Rc::new(move |_event: &Event| {
                let Some(doc) = weak.upgrade() else { return };
                let value = kind.read(&doc, node);
                if let Err(error) = state.root().set(key.as_str(), value) {
                    tracing::warn!(%key, %error, "model write-back failed");
                }
            }),
            ListenerOptions {
                signal: Some(signal.clone()),
                ..Default::default()
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::AbortController;

    fn control(doc: &Document, tag: &str, kind: Option<&str>) -> NodeId {
        let node = doc.create_element(tag);
        if let Some(kind) = kind {
            doc.set_attribute(node, "type", kind);
        }
        doc.append_child(doc.body(), node);
        node
    }

    #[test]
    fn test_classify() {
        let doc = Document::new();
        assert_eq!(ModelKind::classify(&doc, control(&doc, "select", None)), ModelKind::Select);
        assert_eq!(ModelKind::classify(&doc, control(&doc, "input", Some("range"))), ModelKind::Number);
        assert_eq!(ModelKind::classify(&doc, control(&doc, "input", Some("CHECKBOX"))), ModelKind::Checkbox);
        assert_eq!(ModelKind::classify(&doc, control(&doc, "textarea", None)), ModelKind::Text);
    }

    #[test]
    fn test_radio_apply_compares_strings() {
        let doc = Document::new();
        let radio = control(&doc, "input", Some("radio"));
        doc.set_attribute(radio, "value", "2");
        ModelKind::Radio.apply(&doc, radio, &Value::from(2));
        assert!(doc.checked(radio));
        ModelKind::Radio.apply(&doc, radio, &Value::from("3"));
        assert!(!doc.checked(radio));
    }

    #[test]
    fn test_number_write_back_on_change() {
        let doc = Rc::new(Document::new());
        let input = control(&doc, "input", Some("number"));
        let state = ReactiveState::new(Value::from_pairs([("age", 0)]));
        let controller = AbortController::new();
        listen(&doc, input, ModelKind::Number, "age", &state, &controller.signal());

        doc.set_value(input, "25");
        doc.fire(input, "change");
        assert_eq!(state.root().get_value("age"), Value::Number(25.0));

        controller.abort();
        doc.set_value(input, "30");
        doc.fire(input, "input");
        assert_eq!(state.root().get_value("age"), Value::Number(25.0));
    }

    #[test]
    fn test_text_apply_maps_nullish_to_empty() {
        let doc = Document::new();
        let input = control(&doc, "input", None);
        ModelKind::Text.apply(&doc, input, &Value::Null);
        assert_eq!(doc.value(input), "");
        ModelKind::Text.apply(&doc, input, &Value::from(4));
        assert_eq!(doc.value(input), "4");
    }
}
