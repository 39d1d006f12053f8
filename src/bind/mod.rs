//! Bind Module - Markup attributes to live bindings
//!
//! - **Directives** (`:text`, `:class`, `:model`, ...) - compiled once,
//!   re-applied on every render
//! - **Events** (`@click.stop.prevent`) - registered once under the
//!   component's abort signal
//! - **Class lists** - the token combinator behind `:class`

pub mod class_list;
pub mod directive;
pub mod event;
pub mod model;

pub use class_list::{class_tokens, combine};
pub use directive::{BOOLEAN_ATTRIBUTES, Directive, DirectiveKind};
pub use event::{EventBinding, Handler, Modifiers};
pub use model::ModelKind;
