//! Render and handler contexts - the variables an expression can see.
//!
//! Resolution order for an identifier:
//!
//! 1. computed accessors of the component type
//! 2. state keys
//! 3. `event` and `state`, inside event handlers only
//!
//! Anything else is a reference error.

use crate::dom::{Document, Event, EventTarget};
use crate::error::EvalError;
use crate::expr::{Scope, root_name};
use crate::state::StateRef;
use crate::types::{PathKey, Value};

use super::instance::Component;

/// Variable scope for one render or one handler invocation.
pub struct Context<'a> {
    component: &'a Component,
    state: StateRef,
    event: Option<&'a Event>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(component: &'a Component, event: Option<&'a Event>) -> Self {
        Self {
            component,
            state: component.state(),
            event,
        }
    }

    pub fn component(&self) -> &Component {
        self.component
    }

    pub fn state(&self) -> &StateRef {
        &self.state
    }

    /// The event being handled, if any.
    pub fn event(&self) -> Option<&Event> {
        self.event
    }

    /// Resolve `name` as an expression would; undeclared names read as `undefined`.
    pub fn get(&self, name: &str) -> Value {
        self.lookup(name).unwrap_or_default()
    }
}

/// The `event` variable seen by inline handlers.
///
/// A snapshot: `target` and `currentTarget` carry the element fields
/// handlers usually read. The cancellation methods are routed to the live
/// event by [`Context::call_member`].
fn event_value(doc: &Document, event: &Event) -> Value {
    Value::from_pairs([
        ("type", Value::from(event.kind())),
        ("detail", event.detail().clone()),
        ("bubbles", Value::from(event.bubbles())),
        ("defaultPrevented", Value::from(event.default_prevented())),
        ("target", target_value(doc, event.target())),
        ("currentTarget", target_value(doc, event.current_target())),
    ])
}

fn target_value(doc: &Document, target: Option<EventTarget>) -> Value {
    let node = match target {
        Some(EventTarget::Node(node)) if doc.is_element(node) => node,
        _ => return Value::Null,
    };
    Value::from_pairs([
        ("id", Value::from(doc.get_attribute(node, "id").unwrap_or_default())),
        ("tagName", Value::from(doc.tag_name(node))),
        ("type", Value::from(doc.input_type(node))),
        ("name", Value::from(doc.get_attribute(node, "name").unwrap_or_default())),
        ("className", Value::from(doc.class_name(node))),
        ("value", Value::from(doc.value(node))),
        ("checked", Value::from(doc.checked(node))),
        ("textContent", Value::from(doc.text_content(node))),
    ])
}

impl Scope for Context<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(computed) = self.component.definition().computed.get(name) {
            return Some(computed(self));
        }
        if self.state.contains_key(name) {
            return Some(self.state.get_value(name));
        }
        match (name, self.event) {
            ("event", Some(event)) => Some(event_value(self.component.runtime().document(), event)),
            ("state", Some(_)) => Some(self.state.value()),
            _ => None,
        }
    }

    fn assign(&self, path: &[PathKey], value: Value) -> Result<(), EvalError> {
        let root = root_name(path);
        if self.state.contains_key(&root) {
            return Ok(self.state.assign_path(path, value)?);
        }
        if self.component.definition().computed.contains_key(&root) {
            return Err(EvalError::Type(format!("cannot assign to computed '{}'", root)));
        }
        if root == "state" && self.event.is_some() {
            return match &path[1..] {
                [] => Err(EvalError::NotAssignable),
                rest => Ok(self.state.assign_path(rest, value)?),
            };
        }
        Err(EvalError::Reference(root))
    }

    fn call(&self, name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
        let definition = self.component.definition();
        if let Some(function) = definition.functions.get(name) {
            return Some(Ok(function(self, args)));
        }
        let method = definition.methods.get(name)?;
        match self.event {
            Some(event) => method(self.component, event, &self.state),
            None => method(self.component, &Event::new("call"), &self.state),
        }
        Some(Ok(Value::Undefined))
    }

    fn call_member(&self, path: &[PathKey], name: &str, _args: &[Value]) -> Option<Result<Value, EvalError>> {
        let event = self.event?;
        // A state key named `event` shadows the handler's event.
        if path != [PathKey::Key("event".into())] || self.lookup_shadows_event() {
            return None;
        }
        match name {
            "preventDefault" => event.prevent_default(),
            "stopPropagation" => event.stop_propagation(),
            "stopImmediatePropagation" => event.stop_immediate_propagation(),
            _ => return None,
        }
        Some(Ok(Value::Undefined))
    }
}

impl Context<'_> {
    fn lookup_shadows_event(&self) -> bool {
        self.component.definition().computed.contains_key("event") || self.state.contains_key("event")
    }
}
