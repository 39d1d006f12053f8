//! DOM Module - Retained document the bindings render into
//!
//! A small, single-threaded document model: an arena of element and text
//! nodes with browser-like attributes and live properties, a three-phase
//! event system with abort signals, an HTML fragment parser and a selector
//! engine.
//!
//! The binding core only ever sees a `Rc<Document>`; hosts that drive a real
//! rendering surface mirror it from here.
//!
//! # Example
//!
//! ```ignore
//! use spark_bind::dom::Document;
//!
//! let doc = Document::new();
//! doc.append_html(doc.body(), r#"<button class="primary">Save</button>"#);
//! let button = doc.query_selector(doc.body(), "button.primary")?.unwrap();
//! doc.click(button);
//! ```

mod abort;
mod event;
mod markup;
mod node;
mod selector;

pub use abort::{AbortController, AbortSignal};
pub use event::{Event, EventPhase, EventTarget, Listener, ListenerId, ListenerOptions};
pub use node::{Document, NodeId};
pub use selector::Selector;
