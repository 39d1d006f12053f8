//! State Module - Reactive component data
//!
//! Each component owns one [`ReactiveState`]. Any write through a
//! [`StateRef`] view, at any depth, fires the component's notifier, which
//! enqueues it on the render scheduler.

mod reactive;

pub use reactive::{Entry, Notify, ReactiveState, StateRef};
