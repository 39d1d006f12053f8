//! `@name.modifiers` event bindings.

use std::rc::{Rc, Weak};

use bitflags::bitflags;

use crate::dom::{AbortSignal, Document, Event, EventTarget, Listener, ListenerOptions, NodeId};
use crate::error::BindError;
use crate::expr::Expression;

bitflags! {
    /// Event modifiers. Order-independent; unknown names are ignored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        /// Only fire for targets outside the bound node (document listener).
        const OUTSIDE  = 1 << 0;
        /// Only fire when the bound node itself is the target.
        const SELF     = 1 << 1;
        const STOP     = 1 << 2;
        const PREVENT  = 1 << 3;
        const ONCE     = 1 << 4;
        const CAPTURE  = 1 << 5;
        const PASSIVE  = 1 << 6;
        const WINDOW   = 1 << 7;
        const DOCUMENT = 1 << 8;
    }
}

impl Modifiers {
    fn from_modifier(name: &str) -> Option<Self> {
        let flag = match name {
            "outside" => Modifiers::OUTSIDE,
            "self" => Modifiers::SELF,
            "stop" => Modifiers::STOP,
            "prevent" => Modifiers::PREVENT,
            "once" => Modifiers::ONCE,
            "capture" => Modifiers::CAPTURE,
            "passive" => Modifiers::PASSIVE,
            "window" => Modifiers::WINDOW,
            "document" => Modifiers::DOCUMENT,
            _ => return None,
        };
        Some(flag)
    }
}

/// A parsed `name.mod1.mod2` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub name: String,
    pub modifiers: Modifiers,
}

impl EventBinding {
    pub fn parse(declaration: &str) -> Result<Self, BindError> {
        let mut parts = declaration.split('.');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(BindError::EmptyEventName(declaration.to_string()));
        }
        let mut modifiers = Modifiers::empty();
        for part in parts {
            match Modifiers::from_modifier(part) {
                Some(flag) => modifiers |= flag,
                None => tracing::debug!(modifier = part, declaration, "ignoring unknown event modifier"),
            }
        }
        Ok(Self {
            name: name.to_string(),
            modifiers,
        })
    }

    /// Where the listener goes: window, document, or the node itself.
    pub fn target(&self, node: NodeId) -> EventTarget {
        if self.modifiers.contains(Modifiers::WINDOW) {
            EventTarget::Window
        } else if self.modifiers.intersects(Modifiers::DOCUMENT | Modifiers::OUTSIDE) {
            EventTarget::Document
        } else {
            EventTarget::Node(node)
        }
    }

    /// Registration options, cancelled through `signal`.
    pub fn options(&self, signal: &AbortSignal) -> ListenerOptions {
        ListenerOptions {
            capture: self.modifiers.contains(Modifiers::CAPTURE),
            once: self.modifiers.contains(Modifiers::ONCE),
            passive: self.modifiers.contains(Modifiers::PASSIVE),
            signal: Some(signal.clone()),
        }
    }

    /// Wrap `callback` with the dispatch-time modifiers (`outside`, `self`,
    /// `stop`, `prevent`).
    pub fn listener(&self, doc: Weak<Document>, node: NodeId, callback: Listener) -> Listener {
        let modifiers = self.modifiers;
        Rc::new(move |event: &Event| {
            if modifiers.contains(Modifiers::OUTSIDE) {
                let inside = match (doc.upgrade(), event.target_node()) {
                    (Some(doc), Some(target)) => doc.contains(node, target),
                    _ => false,
                };
                if inside {
                    return;
                }
            }
            if modifiers.contains(Modifiers::SELF) && event.target_node() != Some(node) {
                return;
            }
            if modifiers.contains(Modifiers::STOP) {
                event.stop_propagation();
            }
            if modifiers.contains(Modifiers::PREVENT) {
                event.prevent_default();
            }
            callback(event);
        })
    }

    /// Register on `doc` with `callback` as the handler body.
    pub fn register(&self, doc: &Rc<Document>, node: NodeId, signal: &AbortSignal, callback: Listener) {
        let listener = self.listener(Rc::downgrade(doc), node, callback);
        doc.add_event_listener(self.target(node), &self.name, listener, self.options(signal));
    }
}

/// What an event binding runs.
#[derive(Debug, Clone)]
pub enum Handler {
    /// A component method, called as `(component, event, state)`.
    Method(String),
    /// An inline statement list with `event` and `state` in scope.
    Inline(Expression),
}

impl Handler {
    /// A source naming an existing method resolves to it; anything else compiles.
    pub fn resolve(source: &str, is_method: impl Fn(&str) -> bool) -> Result<Self, BindError> {
        let trimmed = source.trim();
        if is_method(trimmed) {
            return Ok(Handler::Method(trimmed.to_string()));
        }
        Expression::compile(source)
            .map(Handler::Inline)
            .map_err(|error| BindError::Compile {
                source_text: source.to_string(),
                error,
            })
    }
}
