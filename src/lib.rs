//! # spark-bind
//!
//! Reactive markup binding for Rust.
//!
//! Attaches state-driven behavior to existing markup without a virtual DOM.
//! Components read their bindings straight from attributes, keep a reactive
//! state tree, and re-apply every binding once per microtask after any write.
//!
//! ## Architecture
//!
//! ```text
//! state write ─► ReactiveState notifier ─► Scheduler::enqueue
//!                                               │  (one microtask)
//!                                               ▼
//!                              Scheduler::flush ─► Component::render
//!                                               │   directives, update hook
//!                                               ▼
//!                                         generation signal += 1
//! ```
//!
//! ## Markup
//!
//! ```html
//! <div id="counter" data-state="{ count: 0 }">
//!   <span :text="count"></span>
//!   <button @click="count++">+</button>
//!   <input type="number" :model="count">
//!   <ul><li ref="[items]">one</li></ul>
//! </div>
//! ```
//!
//! - `:name="expr"` - directive (`text`, `html`, `value`, `show`, `class`,
//!   `model`, boolean attributes, anything else as a plain attribute)
//! - `@event.mod="handler"` - event binding (`outside`, `self`, `stop`,
//!   `prevent`, `once`, `capture`, `passive`, `window`, `document`)
//! - `ref="name"` / `ref="[name]"` - element references
//! - `data-state` / `data-props` - reactive state and read-only props
//!
//! Every binding attribute is stripped once consumed.
//!
//! ## Modules
//!
//! - [`dom`] - retained document, events, selectors and markup
//! - [`expr`] - expression parser and evaluator
//! - [`state`] - reactive state tree
//! - [`pipeline`] - render scheduler
//! - [`bind`] - directive and event binders
//! - [`component`] - component types and instances

pub mod bind;
pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod expr;
pub mod pipeline;
pub mod platform;
pub mod runtime;
pub mod state;
pub mod types;

pub use types::{Map, PathKey, Value, display_path, format_number, parse_number};

pub use config::BindConfig;
pub use error::{BindError, EvalError, ParseError, StateError};
pub use runtime::Runtime;

pub use dom::{
    AbortController, AbortSignal, Document, Event, EventPhase, EventTarget, Listener, ListenerId,
    ListenerOptions, NodeId, Selector,
};

pub use expr::{EmptyScope, Expression, Scope, ValueScope, parse_literal};

pub use state::{Entry, ReactiveState, StateRef};

pub use pipeline::{Renderable, Scheduler};

pub use platform::{Microtask, MicrotaskQueue, Microtasks};

pub use bind::{Directive, DirectiveKind, EventBinding, Handler, ModelKind, Modifiers};

pub use component::{
    Component, ComponentType, Context, DispatchOptions, OnTarget, Ref, Refs, Subscription,
};
