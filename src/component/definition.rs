//! Component types - defaults, computed values, methods and hooks shared by
//! every instance of one kind of component.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::Event;
use crate::state::StateRef;
use crate::types::Value;

use super::context::Context;
use super::instance::Component;

/// Derived value, recomputed on every lookup.
pub type Computed = Rc<dyn Fn(&Context<'_>) -> Value>;
/// Event handler named by `@event="name"`.
pub type Method = Rc<dyn Fn(&Component, &Event, &StateRef)>;
/// Helper callable from expressions (`format(price)`).
pub type Function = Rc<dyn Fn(&Context<'_>, &[Value]) -> Value>;
/// Runs once at the end of construction.
pub type InitHook = Rc<dyn Fn(&Component)>;
/// Runs after every render with the render context.
pub type UpdateHook = Rc<dyn Fn(&Component, &Context<'_>)>;

/// Blueprint for components.
///
/// ```ignore
/// let counter = ComponentType::new("Counter")
///     .state(Value::from_pairs([("count", 0)]))
///     .computed("double", |cx| Value::from(cx.get("count").to_number() * 2.0))
///     .method("increment", |_, _, state| {
///         let next = state.get_value("count").to_number() + 1.0;
///         let _ = state.set("count", next);
///     });
/// ```
#[derive(Clone)]
pub struct ComponentType {
    pub(crate) name: String,
    pub(crate) default_state: Option<Value>,
    pub(crate) computed: IndexMap<String, Computed>,
    pub(crate) methods: IndexMap<String, Method>,
    pub(crate) functions: IndexMap<String, Function>,
    pub(crate) init: Option<InitHook>,
    pub(crate) update: Option<UpdateHook>,
}

impl Default for ComponentType {
    fn default() -> Self {
        Self::new("Component")
    }
}

impl ComponentType {
    /// New type with an empty default state, so instances are reactive.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_state: Some(Value::object()),
            computed: IndexMap::new(),
            methods: IndexMap::new(),
            functions: IndexMap::new(),
            init: None,
            update: None,
        }
    }

    /// Default state, deep-copied into every instance.
    pub fn state(mut self, state: impl Into<Value>) -> Self {
        self.default_state = Some(state.into());
        self
    }

    /// No default state: instances only become reactive when their element
    /// carries a state attribute.
    pub fn stateless(mut self) -> Self {
        self.default_state = None;
        self
    }

    pub fn computed(mut self, name: impl Into<String>, f: impl Fn(&Context<'_>) -> Value + 'static) -> Self {
        self.computed.insert(name.into(), Rc::new(f));
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Component, &Event, &StateRef) + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(f));
        self
    }

    pub fn function(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Context<'_>, &[Value]) -> Value + 'static,
    ) -> Self {
        self.functions.insert(name.into(), Rc::new(f));
        self
    }

    pub fn init(mut self, f: impl Fn(&Component) + 'static) -> Self {
        self.init = Some(Rc::new(f));
        self
    }

    pub fn update(mut self, f: impl Fn(&Component, &Context<'_>) + 'static) -> Self {
        self.update = Some(Rc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_state(&self) -> Option<&Value> {
        self.default_state.as_ref()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.name)
            .field("default_state", &self.default_state)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}
