//! Render Pipeline
//!
//! Connects state writes to DOM updates.
//!
//! ```text
//! state write → notifier → Scheduler::enqueue → microtask → flush → Component::render
//! ```
//!
//! ## Key Design Principles
//!
//! - **One render per tick**: a component rendered in a flush is not
//!   rendered again until the next one
//! - **Explicit instance**: the scheduler is owned by a [`Runtime`](crate::Runtime),
//!   never a global, so tests get isolated queues
//! - **Observable**: each completed flush bumps a `spark_signals` generation signal

pub mod scheduler;

pub use scheduler::{Renderable, Scheduler};
