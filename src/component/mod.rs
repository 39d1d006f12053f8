//! Components - a root element plus its state, bindings and lifecycle.
//!
//! A [`ComponentType`] describes defaults and behavior; [`Component::new`]
//! or [`Component::mount`] instantiates it on markup.

mod context;
mod definition;
mod instance;
mod refs;

pub use context::Context;
pub use definition::{Computed, ComponentType, Function, InitHook, Method, UpdateHook};
pub use instance::{Component, DispatchOptions, OnTarget, Subscription};
pub use refs::{Ref, Refs};
