//! Component instances - discovery, rendering and teardown.
//!
//! ```text
//! constructed ──► active ──► destroyed
//!   refs, props,    renders on     listeners aborted,
//!   state, bind,    every flush    directives cleared,
//!   first enqueue                  dequeued
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bind::event::{EventBinding, Handler};
use crate::bind::{Directive, DirectiveKind, model};
use crate::dom::{AbortController, AbortSignal, Event, Listener, ListenerOptions, NodeId, Selector};
use crate::error::BindError;
use crate::expr::parse_literal;
use crate::pipeline::Renderable;
use crate::runtime::Runtime;
use crate::state::{ReactiveState, StateRef};
use crate::types::Value;

use super::context::Context;
use super::definition::ComponentType;
use super::refs::Refs;

/// Elements targeted by [`Component::on`].
#[derive(Debug, Clone, PartialEq)]
pub enum OnTarget {
    Node(NodeId),
    Nodes(Vec<NodeId>),
    /// Delegated: one capture listener on the root, matched per event.
    Selector(String),
}

impl From<NodeId> for OnTarget {
    fn from(node: NodeId) -> Self {
        OnTarget::Node(node)
    }
}

impl From<Vec<NodeId>> for OnTarget {
    fn from(nodes: Vec<NodeId>) -> Self {
        OnTarget::Nodes(nodes)
    }
}

impl From<&str> for OnTarget {
    fn from(selector: &str) -> Self {
        OnTarget::Selector(selector.to_string())
    }
}

/// Handle for listeners added with [`Component::on`].
#[derive(Debug, Clone)]
pub struct Subscription {
    controller: AbortController,
}

impl Subscription {
    /// Remove the listeners now instead of at destroy.
    pub fn cancel(&self) {
        self.controller.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.controller.signal().aborted()
    }
}

/// Flags for [`Component::dispatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    pub bubbles: bool,
    pub cancelable: bool,
}

// =============================================================================
// Component
// =============================================================================

pub(crate) struct ComponentInner {
    id: u64,
    me: Weak<ComponentInner>,
    runtime: Runtime,
    definition: ComponentType,
    element: Option<NodeId>,
    state: ReactiveState,
    reactive: bool,
    props: Value,
    refs: Refs,
    directives: RefCell<Vec<Directive>>,
    controller: RefCell<Option<AbortController>>,
    subscriptions: RefCell<Vec<AbortController>>,
    destroyed: Cell<bool>,
}

/// A live component bound to one root element.
///
/// Cloning shares the instance. Dropping the last handle tears its
/// listeners down the same way [`destroy`](Self::destroy) does.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

struct Parts {
    element: Option<NodeId>,
    state: ReactiveState,
    reactive: bool,
    props: Value,
    refs: Refs,
}

impl Component {
    /// Construct on `element`: collect refs, props and state, bind the
    /// subtree, queue the first render, then run the init hook.
    pub fn new(runtime: &Runtime, element: NodeId, definition: &ComponentType) -> Self {
        Self::create(runtime, Some(element), definition)
    }

    /// Construct on the first element matching `selector`.
    ///
    /// A missing element logs a warning and yields an inert component.
    pub fn mount(runtime: &Runtime, selector: &str, definition: &ComponentType) -> Self {
        let doc = runtime.document();
        let element = match doc.query_selector(doc.document_element(), selector) {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!(component = definition.name(), selector, %error, "invalid root selector");
                None
            }
        };
        if element.is_none() {
            tracing::warn!(component = definition.name(), selector, "element not found");
        }
        Self::create(runtime, element, definition)
    }

    fn create(runtime: &Runtime, element: Option<NodeId>, definition: &ComponentType) -> Self {
        let parts = match element {
            Some(element) => Self::discover(runtime, element, definition),
            None => Parts {
                element: None,
                state: ReactiveState::new(Value::object()),
                reactive: false,
                props: Value::object(),
                refs: Refs::default(),
            },
        };
        let reactive = parts.reactive;
        let inner = Rc::new_cyclic(|me| ComponentInner {
            id: runtime.scheduler().allocate_id(),
            me: me.clone(),
            runtime: runtime.clone(),
            definition: definition.clone(),
            element: parts.element,
            state: parts.state,
            reactive,
            props: parts.props,
            refs: parts.refs,
            directives: RefCell::new(Vec::new()),
            controller: RefCell::new(None),
            subscriptions: RefCell::new(Vec::new()),
            destroyed: Cell::new(false),
        });
        let component = Component { inner };

        if let Some(element) = component.inner.element {
            if reactive {
                component.install_notifier();
                let bound = component.bind(element);
                tracing::debug!(
                    component = definition.name(),
                    id = component.id(),
                    bound,
                    refs = component.inner.refs.len(),
                    "constructed"
                );
                component.enqueue();
            }
            if let Some(init) = definition.init.clone() {
                init(&component);
            }
        }
        component
    }

    /// Refs, props and state from the root element; strips what it consumes.
    fn discover(runtime: &Runtime, element: NodeId, definition: &ComponentType) -> Parts {
        let doc = runtime.document();
        let config = runtime.config();

        let mut refs = Refs::default();
        for node in doc.walk_elements(element).into_iter().skip(1) {
            if let Some(raw) = doc.get_attribute(node, &config.ref_attribute) {
                refs.insert(&raw, node);
                doc.remove_attribute(node, &config.ref_attribute);
            }
        }

        let props = doc
            .get_attribute(element, &config.props_attribute)
            .map(|raw| parse_literal(&raw))
            .unwrap_or_else(Value::object);

        let declared = doc.get_attribute(element, &config.state_attribute);
        let reactive = declared.is_some() || definition.default_state.is_some();
        let initial = match declared.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_literal(raw),
            // Clone is deep: no two instances share a nested container.
            _ => definition.default_state.clone().unwrap_or_else(Value::object),
        };

        doc.remove_attribute(element, &config.props_attribute);
        doc.remove_attribute(element, &config.state_attribute);

        Parts {
            element: Some(element),
            state: ReactiveState::new(initial),
            reactive,
            props,
            refs,
        }
    }

    fn install_notifier(&self) {
        let me = self.inner.me.clone();
        self.inner.state.set_notifier(Rc::new(move || {
            if let Some(inner) = me.upgrade() {
                Component { inner }.enqueue();
            }
        }));
    }

    fn enqueue(&self) {
        let renderable: Rc<dyn Renderable> = self.inner.clone();
        self.inner.runtime.scheduler().enqueue(&renderable);
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Bind every `:` and `@` attribute on `root` and its descendants, then
    /// strip them. Returns how many bindings were created.
    ///
    /// Consumed attributes are gone afterwards, so binding the same subtree
    /// twice creates nothing new. Components without state bind nothing.
    pub fn bind(&self, root: NodeId) -> usize {
        if self.is_destroyed() || !self.inner.reactive {
            return 0;
        }
        let doc = self.inner.runtime.document();
        let config = self.inner.runtime.config();
        let mut bound = 0;

        for node in doc.walk_elements(root) {
            for (name, source) in doc.attributes(node) {
                let result = if let Some(directive) = config.directive_name(&name) {
                    self.bind_directive(node, directive, &source)
                } else if let Some(declaration) = config.event_declaration(&name) {
                    self.bind_event(node, declaration, &source)
                } else {
                    continue;
                };
                match result {
                    Ok(()) => bound += 1,
                    Err(error) => tracing::warn!(
                        component = self.name(),
                        attribute = %name,
                        %error,
                        "skipping binding"
                    ),
                }
                doc.remove_attribute(node, &name);
            }
        }
        bound
    }

    fn bind_directive(&self, node: NodeId, name: &str, source: &str) -> Result<(), BindError> {
        let doc = self.inner.runtime.document();
        let directive = Directive::bind(doc, node, name, source)?;
        if let DirectiveKind::Model { kind, key } = directive.kind() {
            model::listen(doc, node, *kind, key, &self.inner.state, &self.signal());
        }
        self.inner.directives.borrow_mut().push(directive);
        Ok(())
    }

    fn bind_event(&self, node: NodeId, declaration: &str, source: &str) -> Result<(), BindError> {
        let binding = EventBinding::parse(declaration)?;
        let handler = Handler::resolve(source, |name| self.inner.definition.has_method(name))?;
        let me = self.inner.me.clone();
        let callback: Listener = Rc::new(move |event: &Event| {
            if let Some(inner) = me.upgrade() {
                Component { inner }.run_handler(&handler, event);
            }
        });
        binding.register(self.inner.runtime.document(), node, &self.signal(), callback);
        Ok(())
    }

    /// Shared cancellation signal, created on first use.
    fn signal(&self) -> AbortSignal {
        self.inner
            .controller
            .borrow_mut()
            .get_or_insert_with(AbortController::new)
            .signal()
    }

    fn run_handler(&self, handler: &Handler, event: &Event) {
        if self.is_destroyed() {
            return;
        }
        match handler {
            Handler::Method(name) => {
                let method = self.inner.definition.methods.get(name).cloned();
                if let Some(method) = method {
                    method(self, event, &self.state());
                }
            }
            Handler::Inline(expression) => {
                let cx = Context::new(self, Some(event));
                if let Err(error) = expression.evaluate(&cx) {
                    tracing::warn!(
                        component = self.name(),
                        event = event.kind(),
                        source = expression.source(),
                        %error,
                        "event handler failed"
                    );
                }
            }
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Apply every directive, then run the update hook.
    ///
    /// The scheduler calls this once per flush; calling it directly forces
    /// a synchronous update.
    pub fn render(&self) {
        if self.is_destroyed() {
            return;
        }
        let directives = self.inner.directives.borrow().clone();
        let doc = self.inner.runtime.document();
        let config = self.inner.runtime.config();
        let cx = Context::new(self, None);
        for directive in &directives {
            directive.apply(doc, &cx, config);
        }
        if let Some(update) = self.inner.definition.update.clone() {
            update(self, &cx);
        }
        tracing::debug!(component = self.name(), id = self.id(), directives = directives.len(), "render");
    }

    /// Tear down: abort every listener, clear directives, leave the queue.
    ///
    /// Idempotent. State stays writable afterwards but nothing renders.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        self.inner.abort_listeners();
        self.inner.directives.borrow_mut().clear();
        self.inner.runtime.scheduler().remove(self.id());
        tracing::debug!(component = self.name(), id = self.id(), "destroyed");
    }

    // =========================================================================
    // Extras
    // =========================================================================

    /// First descendant of the root matching `selector`.
    pub fn find_one(&self, selector: &str) -> Option<NodeId> {
        let element = self.inner.element?;
        self.inner
            .runtime
            .document()
            .query_selector(element, selector)
            .unwrap_or_else(|error| {
                tracing::warn!(component = self.name(), selector, %error, "invalid selector");
                None
            })
    }

    /// Every descendant of the root matching `selector`, in document order.
    pub fn find_all(&self, selector: &str) -> Vec<NodeId> {
        let Some(element) = self.inner.element else {
            return Vec::new();
        };
        self.inner
            .runtime
            .document()
            .query_selector_all(element, selector)
            .unwrap_or_else(|error| {
                tracing::warn!(component = self.name(), selector, %error, "invalid selector");
                Vec::new()
            })
    }

    /// Listen for space-separated `events` on `target`; removed on destroy.
    ///
    /// `callback` receives the event and the element it matched: the node
    /// itself, or for a selector the nearest matching element inside the root.
    pub fn on(
        &self,
        events: &str,
        target: impl Into<OnTarget>,
        callback: impl Fn(&Event, NodeId) + 'static,
    ) -> Subscription {
        let controller = AbortController::new();
        let subscription = Subscription {
            controller: controller.clone(),
        };
        if self.is_destroyed() {
            controller.abort();
            return subscription;
        }
        self.inner.subscriptions.borrow_mut().push(controller.clone());

        let doc = self.inner.runtime.document();
        let callback: Rc<dyn Fn(&Event, NodeId)> = Rc::new(callback);
        let options = ListenerOptions {
            signal: Some(controller.signal()),
            ..Default::default()
        };

        match target.into() {
            OnTarget::Node(node) => self.listen_nodes(events, &[node], &callback, &options),
            OnTarget::Nodes(nodes) => self.listen_nodes(events, &nodes, &callback, &options),
            OnTarget::Selector(selector) => {
                let Some(root) = self.inner.element else {
                    return subscription;
                };
                let selector = match Selector::parse(&selector) {
                    Ok(selector) => Rc::new(selector),
                    Err(error) => {
                        tracing::warn!(component = self.name(), %error, "invalid delegation selector");
                        return subscription;
                    }
                };
                let capture = ListenerOptions {
                    capture: true,
                    ..options
                };
                for kind in events.split_whitespace() {
                    let weak = Rc::downgrade(doc);
                    let selector = selector.clone();
                    let callback = callback.clone();
                    doc.add_event_listener(
                        root,
                        kind,
                        Rc::new(move |event: &Event| {
                            let (Some(doc), Some(target)) = (weak.upgrade(), event.target_node()) else {
                                return;
                            };
                            let matched = if event.bubbles() {
                                doc.closest(target, &selector)
                                    .filter(|found| doc.contains(root, *found))
                            } else {
                                doc.matches(target, &selector).then_some(target)
                            };
                            if let Some(matched) = matched {
                                callback(event, matched);
                            }
                        }),
                        capture.clone(),
                    );
                }
            }
        }
        subscription
    }

    fn listen_nodes(
        &self,
        events: &str,
        nodes: &[NodeId],
        callback: &Rc<dyn Fn(&Event, NodeId)>,
        options: &ListenerOptions,
    ) {
        let doc = self.inner.runtime.document();
        for kind in events.split_whitespace() {
            for &node in nodes {
                let callback = callback.clone();
                doc.add_event_listener(
                    node,
                    kind,
                    Rc::new(move |event: &Event| callback(event, node)),
                    options.clone(),
                );
            }
        }
    }

    /// Dispatch a custom event carrying `detail` from the root element.
    ///
    /// Returns false if a listener prevented the default (or there is no root).
    pub fn dispatch(&self, kind: &str, detail: impl Into<Value>, options: DispatchOptions) -> bool {
        let Some(element) = self.inner.element else {
            tracing::warn!(component = self.name(), event = kind, "dispatch on inert component");
            return false;
        };
        let event = Event::new(kind)
            .with_bubbles(options.bubbles)
            .with_cancelable(options.cancelable)
            .with_detail(detail.into());
        self.inner.runtime.document().dispatch_event(element, &event)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        self.inner.definition.name()
    }

    pub fn definition(&self) -> &ComponentType {
        &self.inner.definition
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Root element; `None` for an inert component.
    pub fn element(&self) -> Option<NodeId> {
        self.inner.element
    }

    pub fn is_inert(&self) -> bool {
        self.inner.element.is_none()
    }

    /// True if writes to state schedule renders.
    pub fn is_reactive(&self) -> bool {
        self.inner.reactive
    }

    /// Root view of the component's state.
    pub fn state(&self) -> StateRef {
        self.inner.state.root()
    }

    /// Props parsed from the element; never reactive.
    pub fn props(&self) -> &Value {
        &self.inner.props
    }

    pub fn refs(&self) -> &Refs {
        &self.inner.refs
    }

    pub fn directive_count(&self) -> usize {
        self.inner.directives.borrow().len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }
}

impl ComponentInner {
    fn abort_listeners(&self) {
        for subscription in self.subscriptions.borrow_mut().drain(..) {
            subscription.abort();
        }
        if let Some(controller) = self.controller.borrow().as_ref() {
            controller.abort();
        }
    }
}

impl Renderable for ComponentInner {
    fn render_id(&self) -> u64 {
        self.id
    }

    fn render(&self) {
        if let Some(inner) = self.me.upgrade() {
            Component { inner }.render();
        }
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

impl Drop for ComponentInner {
    fn drop(&mut self) {
        self.abort_listeners();
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name())
            .field("id", &self.id())
            .field("element", &self.inner.element)
            .field("directives", &self.directive_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
