//! Runtime - the document, scheduler and configuration every component shares.

use std::rc::Rc;

use crate::config::BindConfig;
use crate::dom::Document;
use crate::pipeline::Scheduler;
use crate::platform::{MicrotaskQueue, Microtasks};

/// Shared services for a set of components. Cheap to clone.
///
/// Build one per host (or per test) and pass it to every component; nothing
/// in the crate is global.
#[derive(Clone)]
pub struct Runtime {
    document: Rc<Document>,
    scheduler: Scheduler,
    config: Rc<BindConfig>,
}

impl Runtime {
    /// Wire a runtime over a host document and microtask facility.
    pub fn new(document: Rc<Document>, microtasks: Rc<dyn Microtasks>, config: BindConfig) -> Self {
        let scheduler = Scheduler::new(microtasks, config.max_flush_depth);
        Self {
            document,
            scheduler,
            config: Rc::new(config),
        }
    }

    /// Fresh document plus a [`MicrotaskQueue`] the caller drains.
    pub fn headless(config: BindConfig) -> (Self, Rc<MicrotaskQueue>) {
        let queue = Rc::new(MicrotaskQueue::new());
        let runtime = Self::new(Rc::new(Document::new()), queue.clone(), config);
        (runtime, queue)
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &BindConfig {
        &self.config
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("pending", &self.scheduler.pending())
            .field("generation", &self.scheduler.generation())
            .finish()
    }
}
