//! Events - listener registration and three-phase dispatch.
//!
//! Dispatch walks capture (outermost first), target, then bubble. The
//! listener table is snapshotted per target so callbacks may add or remove
//! listeners, or mutate the tree, while an event is in flight.

use std::cell::Cell;
use std::rc::Rc;

use super::abort::AbortSignal;
use super::node::{Document, NodeId};
use crate::types::Value;

/// Something listeners can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Document,
    Node(NodeId),
}

impl From<NodeId> for EventTarget {
    fn from(node: NodeId) -> Self {
        EventTarget::Node(node)
    }
}

/// Dispatch phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// Handle returned by registration, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener callback.
pub type Listener = Rc<dyn Fn(&Event)>;

/// Registration flags.
#[derive(Debug, Clone, Default)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    /// `prevent_default` is ignored inside passive listeners.
    pub passive: bool,
    pub signal: Option<AbortSignal>,
}

pub(crate) struct ListenerEntry {
    id: ListenerId,
    target: EventTarget,
    kind: String,
    options: ListenerOptions,
    callback: Listener,
    removed: Rc<Cell<bool>>,
}

impl ListenerEntry {
    fn is_live(&self) -> bool {
        !self.removed.get() && !self.options.signal.as_ref().is_some_and(AbortSignal::aborted)
    }
}

// =============================================================================
// Event
// =============================================================================

/// A dispatched event. Flags use interior mutability so listeners receive `&Event`.
pub struct Event {
    kind: String,
    bubbles: bool,
    cancelable: bool,
    detail: Value,
    target: Cell<Option<EventTarget>>,
    current_target: Cell<Option<EventTarget>>,
    phase: Cell<EventPhase>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
    immediate_stopped: Cell<bool>,
    in_passive: Cell<bool>,
}

impl Event {
    /// Non-bubbling, non-cancelable event.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            bubbles: false,
            cancelable: false,
            detail: Value::Undefined,
            target: Cell::new(None),
            current_target: Cell::new(None),
            phase: Cell::new(EventPhase::None),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
            immediate_stopped: Cell::new(false),
            in_passive: Cell::new(false),
        }
    }

    /// Bubbling, cancelable event (what user input produces).
    pub fn bubbling(kind: impl Into<String>) -> Self {
        Self::new(kind).with_bubbles(true).with_cancelable(true)
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    /// Attach a payload (custom events).
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    pub fn target(&self) -> Option<EventTarget> {
        self.target.get()
    }

    /// Target element, if the event was dispatched on a node.
    pub fn target_node(&self) -> Option<NodeId> {
        match self.target.get() {
            Some(EventTarget::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn current_target(&self) -> Option<EventTarget> {
        self.current_target.get()
    }

    pub fn phase(&self) -> EventPhase {
        self.phase.get()
    }

    pub fn prevent_default(&self) {
        if self.in_passive.get() {
            tracing::debug!(event = %self.kind, "prevent_default ignored in passive listener");
            return;
        }
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn stop_immediate_propagation(&self) {
        self.propagation_stopped.set(true);
        self.immediate_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("target", &self.target.get())
            .field("phase", &self.phase.get())
            .finish()
    }
}

// =============================================================================
// Registration and dispatch
// =============================================================================

impl Document {
    /// Register `listener` for `kind` events on `target`.
    ///
    /// Registering with an already aborted signal is a no-op.
    pub fn add_event_listener(
        &self,
        target: impl Into<EventTarget>,
        kind: &str,
        listener: Listener,
        options: ListenerOptions,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        if options.signal.as_ref().is_some_and(AbortSignal::aborted) {
            return id;
        }
        self.listeners.borrow_mut().push(ListenerEntry {
            id,
            target: target.into(),
            kind: kind.to_string(),
            options,
            callback: listener,
            removed: Rc::new(Cell::new(false)),
        });
        id
    }

    pub fn remove_event_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|entry| {
            if entry.id == id {
                entry.removed.set(true);
                false
            } else {
                true
            }
        });
    }

    /// Live listeners on `target` (all kinds).
    pub fn listener_count(&self, target: impl Into<EventTarget>) -> usize {
        let target = target.into();
        self.prune_listeners();
        self.listeners
            .borrow()
            .iter()
            .filter(|entry| entry.target == target)
            .count()
    }

    fn prune_listeners(&self) {
        self.listeners.borrow_mut().retain(ListenerEntry::is_live);
    }

    /// Propagation path from the outermost target down to `target`.
    fn event_path(&self, target: EventTarget) -> Vec<EventTarget> {
        match target {
            EventTarget::Window => vec![EventTarget::Window],
            EventTarget::Document => vec![EventTarget::Window, EventTarget::Document],
            EventTarget::Node(node) => {
                let mut path: Vec<EventTarget> = Vec::new();
                if self.is_connected(node) {
                    path.push(EventTarget::Window);
                    path.push(EventTarget::Document);
                }
                path.extend(self.ancestors(node).into_iter().rev().map(EventTarget::Node));
                path.push(EventTarget::Node(node));
                path
            }
        }
    }

    /// Dispatch `event` at `target`. Returns false if the default was prevented.
    pub fn dispatch_event(&self, target: impl Into<EventTarget>, event: &Event) -> bool {
        let target = target.into();
        event.target.set(Some(target));
        let path = self.event_path(target);
        let last = path.len() - 1;

        for current in &path[..last] {
            if event.propagation_stopped() {
                break;
            }
            event.phase.set(EventPhase::Capturing);
            self.invoke(*current, event, Some(true));
        }
        if !event.propagation_stopped() {
            event.phase.set(EventPhase::AtTarget);
            self.invoke(target, event, None);
        }
        if event.bubbles {
            for current in path[..last].iter().rev() {
                if event.propagation_stopped() {
                    break;
                }
                event.phase.set(EventPhase::Bubbling);
                self.invoke(*current, event, Some(false));
            }
        }

        event.phase.set(EventPhase::None);
        event.current_target.set(None);
        self.prune_listeners();
        !event.default_prevented()
    }

    /// Run the listeners of one target. `capture` filters by registration
    /// phase; `None` runs both (at-target), capture listeners first.
    fn invoke(&self, target: EventTarget, event: &Event, capture: Option<bool>) {
        let mut snapshot: Vec<(Listener, ListenerOptions, Rc<Cell<bool>>)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.target == target && entry.kind == event.kind)
            .filter(|entry| capture.is_none_or(|c| entry.options.capture == c))
            .filter(|entry| entry.is_live())
            .map(|entry| (entry.callback.clone(), entry.options.clone(), entry.removed.clone()))
            .collect();
        if snapshot.is_empty() {
            return;
        }
        if capture.is_none() {
            snapshot.sort_by_key(|(_, options, _)| !options.capture);
        }

        event.current_target.set(Some(target));
        for (callback, options, removed) in snapshot {
            if removed.get() || options.signal.as_ref().is_some_and(AbortSignal::aborted) {
                continue;
            }
            if options.once {
                removed.set(true);
            }
            event.in_passive.set(options.passive);
            callback(event);
            event.in_passive.set(false);
            if event.immediate_stopped.get() {
                break;
            }
        }
    }

    /// Fire a bubbling event of `kind` at `node`.
    pub fn fire(&self, node: NodeId, kind: &str) -> bool {
        self.dispatch_event(node, &Event::bubbling(kind))
    }

    /// Simulate a user click.
    ///
    /// Checkboxes toggle and radios select before dispatch; a prevented
    /// click restores the previous state. A changed control then receives
    /// `input` and `change`.
    pub fn click(&self, node: NodeId) -> bool {
        let toggles = self.local_name(node) == "input"
            && matches!(self.input_type(node).as_str(), "checkbox" | "radio");
        let before = self.checked(node);
        let radio_peers = if toggles && self.input_type(node) == "radio" {
            self.radio_group(node)
        } else {
            Vec::new()
        };
        let peer_state: Vec<(NodeId, bool)> =
            radio_peers.iter().map(|peer| (*peer, self.checked(*peer))).collect();

        if toggles {
            if radio_peers.is_empty() {
                self.set_checked(node, !before);
            } else {
                for peer in &radio_peers {
                    self.set_checked(*peer, *peer == node);
                }
            }
        }

        let proceed = self.dispatch_event(node, &Event::bubbling("click"));

        if toggles {
            if !proceed {
                self.set_checked(node, before);
                for (peer, state) in peer_state {
                    self.set_checked(peer, state);
                }
            } else if self.checked(node) != before {
                self.fire(node, "input");
                self.fire(node, "change");
            }
        }
        proceed
    }

    /// Radios sharing `node`'s name in the same tree, including `node`.
    fn radio_group(&self, node: NodeId) -> Vec<NodeId> {
        let Some(name) = self.get_attribute(node, "name") else {
            return vec![node];
        };
        let top = self.ancestors(node).last().copied().unwrap_or(node);
        self.walk_elements(top)
            .into_iter()
            .filter(|el| {
                self.local_name(*el) == "input"
                    && self.input_type(*el) == "radio"
                    && self.get_attribute(*el, "name").as_deref() == Some(name.as_str())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::AbortController;
    use std::cell::RefCell;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &str) -> Listener {
        let log = log.clone();
        let label = label.to_string();
        Rc::new(move |_event: &Event| log.borrow_mut().push(label.clone()))
    }

    fn tree() -> (Document, NodeId, NodeId) {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("button");
        doc.append_child(doc.body(), outer);
        doc.append_child(outer, inner);
        (doc, outer, inner)
    }

    #[test]
    fn test_capture_target_bubble_order() {
        let (doc, outer, inner) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        let capture = ListenerOptions {
            capture: true,
            ..Default::default()
        };
        doc.add_event_listener(outer, "click", recorder(&log, "outer-bubble"), Default::default());
        doc.add_event_listener(outer, "click", recorder(&log, "outer-capture"), capture.clone());
        doc.add_event_listener(inner, "click", recorder(&log, "inner"), Default::default());
        doc.add_event_listener(EventTarget::Document, "click", recorder(&log, "document"), Default::default());

        doc.click(inner);
        assert_eq!(*log.borrow(), vec!["outer-capture", "inner", "outer-bubble", "document"]);
    }

    #[test]
    fn test_stop_propagation() {
        let (doc, outer, inner) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_event_listener(outer, "click", recorder(&log, "outer"), Default::default());
        doc.add_event_listener(inner, "click", Rc::new(|e: &Event| e.stop_propagation()), Default::default());
        doc.click(inner);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_once_and_signal() {
        let (doc, _, inner) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        let controller = AbortController::new();
        doc.add_event_listener(
            inner,
            "click",
            recorder(&log, "once"),
            ListenerOptions {
                once: true,
                ..Default::default()
            },
        );
        doc.add_event_listener(
            inner,
            "click",
            recorder(&log, "signal"),
            ListenerOptions {
                signal: Some(controller.signal()),
                ..Default::default()
            },
        );
        doc.click(inner);
        controller.abort();
        doc.click(inner);
        assert_eq!(*log.borrow(), vec!["once", "signal"]);
        assert_eq!(doc.listener_count(inner), 0);
    }

    #[test]
    fn test_passive_ignores_prevent_default() {
        let (doc, _, inner) = tree();
        doc.add_event_listener(
            inner,
            "click",
            Rc::new(|e: &Event| e.prevent_default()),
            ListenerOptions {
                passive: true,
                ..Default::default()
            },
        );
        assert!(doc.click(inner));
    }

    #[test]
    fn test_click_toggles_checkbox_and_fires_change() {
        let doc = Document::new();
        let input = doc.create_element("input");
        doc.set_attribute(input, "type", "checkbox");
        doc.append_child(doc.body(), input);
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_event_listener(input, "change", recorder(&log, "change"), Default::default());

        doc.click(input);
        assert!(doc.checked(input));
        assert_eq!(*log.borrow(), vec!["change"]);

        doc.add_event_listener(input, "click", Rc::new(|e: &Event| e.prevent_default()), Default::default());
        doc.click(input);
        assert!(doc.checked(input));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_radio_click_clears_group() {
        let doc = Document::new();
        let form = doc.create_element("form");
        doc.append_child(doc.body(), form);
        let radios: Vec<NodeId> = (0..2)
            .map(|_| {
                let radio = doc.create_element("input");
                doc.set_attribute(radio, "type", "radio");
                doc.set_attribute(radio, "name", "size");
                doc.append_child(form, radio);
                radio
            })
            .collect();
        doc.click(radios[0]);
        doc.click(radios[1]);
        assert!(!doc.checked(radios[0]));
        assert!(doc.checked(radios[1]));
    }

    #[test]
    fn test_listener_may_remove_itself_mid_dispatch() {
        let (doc, _, inner) = tree();
        let doc = Rc::new(doc);
        let hits = Rc::new(Cell::new(0));
        let id_cell: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        let listener: Listener = {
            let doc = Rc::downgrade(&doc);
            let hits = hits.clone();
            let id_cell = id_cell.clone();
            Rc::new(move |_e: &Event| {
                hits.set(hits.get() + 1);
                if let (Some(doc), Some(id)) = (doc.upgrade(), id_cell.get()) {
                    doc.remove_event_listener(id);
                }
            })
        };
        id_cell.set(Some(doc.add_event_listener(inner, "click", listener, Default::default())));
        doc.click(inner);
        doc.click(inner);
        assert_eq!(hits.get(), 1);
    }
}
