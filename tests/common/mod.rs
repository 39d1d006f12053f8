//! Shared fixture for integration tests: a headless runtime plus helpers
//! for loading markup and ending the current turn.

#![allow(dead_code)]

use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use spark_bind::{BindConfig, Component, ComponentType, Document, MicrotaskQueue, NodeId, Runtime};

pub struct Fixture {
    pub runtime: Runtime,
    pub queue: Rc<MicrotaskQueue>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(BindConfig::default())
    }

    pub fn with_config(config: BindConfig) -> Self {
        let (runtime, queue) = Runtime::headless(config);
        Self { runtime, queue }
    }

    pub fn doc(&self) -> &Rc<Document> {
        self.runtime.document()
    }

    /// Append `html` to the body and return its first top-level element.
    pub fn load(&self, html: &str) -> NodeId {
        let doc = self.doc();
        doc.append_html(doc.body(), html)
            .into_iter()
            .find(|node| doc.is_element(*node))
            .expect("markup has an element")
    }

    /// Load `html` and construct `ty` on its first element.
    pub fn mount(&self, html: &str, ty: &ComponentType) -> Component {
        let root = self.load(html);
        Component::new(&self.runtime, root, ty)
    }

    /// End the turn: run every pending microtask.
    pub fn tick(&self) -> usize {
        self.queue.tick()
    }

    pub fn find(&self, selector: &str) -> NodeId {
        let doc = self.doc();
        doc.query_selector(doc.document_element(), selector)
            .expect("valid selector")
            .unwrap_or_else(|| panic!("no element matches {selector}"))
    }

    pub fn text(&self, selector: &str) -> String {
        self.doc().text_content(self.find(selector))
    }
}

/// A component type whose update hook counts renders.
pub fn counting(name: &str) -> (ComponentType, Rc<Cell<usize>>) {
    let renders = Rc::new(Cell::new(0));
    let seen = renders.clone();
    let ty = ComponentType::new(name).update(move |_, _| seen.set(seen.get() + 1));
    (ty, renders)
}

/// Log sink shared with a `tracing` subscriber.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut bytes) = self.0.lock() {
            bytes.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with warnings captured; returns its result and the log text.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let sink = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}
