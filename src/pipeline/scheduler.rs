//! Render scheduler - coalesces state writes into one render per tick.
//!
//! ```text
//! write → enqueue(component) ─┬─ already scheduled? done
//!                             └─ queue_microtask(flush)
//!
//! flush: take queue → render each (insertion order) → generation += 1
//! ```
//!
//! The queue is taken whole at flush start, so a write made while rendering
//! lands in a fresh queue and renders in the next flush, never the current
//! one. Membership is keyed by component id: enqueueing twice in one tick
//! renders once.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use spark_signals::{Signal, signal};

use crate::platform::Microtasks;

/// Something the scheduler can re-render.
pub trait Renderable {
    /// Stable id, unique within one scheduler.
    fn render_id(&self) -> u64;

    /// Re-apply every binding. Must contain its own failures.
    fn render(&self);

    /// Destroyed components are never queued or rendered.
    fn is_destroyed(&self) -> bool;
}

struct Inner {
    queue: RefCell<IndexMap<u64, Weak<dyn Renderable>>>,
    scheduled: Cell<bool>,
    flushing: Cell<bool>,
    /// Set when a component is enqueued during a flush.
    chained: Cell<bool>,
    depth: Cell<usize>,
    max_depth: usize,
    next_id: Cell<u64>,
    microtasks: Rc<dyn Microtasks>,
    generation: Signal<u64>,
}

/// Batching render queue. Cloning shares the queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl Scheduler {
    /// Create a scheduler deferring flushes through `microtasks`.
    ///
    /// `max_depth` bounds chains of flushes where each one was triggered by
    /// writes made while rendering the previous one.
    pub fn new(microtasks: Rc<dyn Microtasks>, max_depth: usize) -> Self {
        Self {
            inner: Rc::new(Inner {
                queue: RefCell::new(IndexMap::new()),
                scheduled: Cell::new(false),
                flushing: Cell::new(false),
                chained: Cell::new(false),
                depth: Cell::new(0),
                max_depth,
                next_id: Cell::new(1),
                microtasks,
                generation: signal(0),
            }),
        }
    }

    /// Hand out a fresh component id.
    pub fn allocate_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    /// Mark `component` dirty and make sure a flush is scheduled.
    pub fn enqueue(&self, component: &Rc<dyn Renderable>) {
        if component.is_destroyed() {
            return;
        }
        let inner = &self.inner;
        inner
            .queue
            .borrow_mut()
            .entry(component.render_id())
            .or_insert_with(|| Rc::downgrade(component));
        if inner.flushing.get() {
            inner.chained.set(true);
        }
        if inner.scheduled.replace(true) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        inner.microtasks.queue_microtask(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Scheduler { inner }.flush();
            }
        }));
    }

    /// Drop `id` from the queue (destroy).
    pub fn remove(&self, id: u64) {
        self.inner.queue.borrow_mut().shift_remove(&id);
    }

    pub fn is_queued(&self, id: u64) -> bool {
        self.inner.queue.borrow().contains_key(&id)
    }

    /// Number of components waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// True while a flush microtask is outstanding.
    pub fn is_scheduled(&self) -> bool {
        self.inner.scheduled.get()
    }

    /// Completed flushes so far.
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    /// Reactive view of [`generation`](Self::generation) for host effects.
    pub fn generation_signal(&self) -> Signal<u64> {
        self.inner.generation.clone()
    }

    /// Render everything currently queued.
    ///
    /// Normally run from the scheduled microtask; hosts may call it directly
    /// to force a synchronous update.
    pub fn flush(&self) {
        let inner = &self.inner;
        if inner.flushing.get() {
            return;
        }
        inner.scheduled.set(false);

        let depth = if inner.chained.replace(false) {
            inner.depth.get() + 1
        } else {
            0
        };
        inner.depth.set(depth);
        if depth > inner.max_depth {
            let dropped = std::mem::take(&mut *inner.queue.borrow_mut());
            inner.depth.set(0);
            tracing::warn!(
                dropped = dropped.len(),
                max_depth = inner.max_depth,
                "render loop exceeded max flush depth; dropping queue"
            );
            return;
        }

        let batch = std::mem::take(&mut *inner.queue.borrow_mut());
        if batch.is_empty() {
            return;
        }
        tracing::debug!(components = batch.len(), depth, "flush");

        inner.flushing.set(true);
        for (id, weak) in batch {
            match weak.upgrade() {
                Some(component) if !component.is_destroyed() => component.render(),
                _ => tracing::trace!(id, "skipping dropped component"),
            }
        }
        inner.flushing.set(false);

        inner.generation.set(inner.generation.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MicrotaskQueue;

    struct Probe {
        id: u64,
        renders: Cell<usize>,
        destroyed: Cell<bool>,
        on_render: RefCell<Option<Box<dyn Fn()>>>,
    }

    impl Renderable for Probe {
        fn render_id(&self) -> u64 {
            self.id
        }

        fn render(&self) {
            self.renders.set(self.renders.get() + 1);
            if let Some(hook) = &*self.on_render.borrow() {
                hook();
            }
        }

        fn is_destroyed(&self) -> bool {
            self.destroyed.get()
        }
    }

    fn setup(max_depth: usize) -> (Rc<MicrotaskQueue>, Scheduler) {
        let queue = Rc::new(MicrotaskQueue::new());
        let scheduler = Scheduler::new(queue.clone(), max_depth);
        (queue, scheduler)
    }

    fn probe(scheduler: &Scheduler) -> Rc<Probe> {
        Rc::new(Probe {
            id: scheduler.allocate_id(),
            renders: Cell::new(0),
            destroyed: Cell::new(false),
            on_render: RefCell::new(None),
        })
    }

    #[test]
    fn test_enqueue_coalesces_within_a_tick() {
        let (queue, scheduler) = setup(100);
        let p = probe(&scheduler);
        let as_dyn: Rc<dyn Renderable> = p.clone();
        for _ in 0..5 {
            scheduler.enqueue(&as_dyn);
        }
        assert_eq!(p.renders.get(), 0);
        assert_eq!(queue.len(), 1);
        queue.tick();
        assert_eq!(p.renders.get(), 1);
        assert_eq!(scheduler.generation(), 1);
        assert!(!scheduler.is_scheduled());
    }

    #[test]
    fn test_renders_in_insertion_order() {
        let (queue, scheduler) = setup(100);
        let log = Rc::new(RefCell::new(Vec::new()));
        let probes: Vec<Rc<Probe>> = (0..3).map(|_| probe(&scheduler)).collect();
        for p in probes.iter().rev() {
            let log = log.clone();
            let id = p.id;
            *p.on_render.borrow_mut() = Some(Box::new(move || log.borrow_mut().push(id)));
            let as_dyn: Rc<dyn Renderable> = p.clone();
            scheduler.enqueue(&as_dyn);
        }
        queue.tick();
        let expected: Vec<u64> = probes.iter().rev().map(|p| p.id).collect();
        assert_eq!(*log.borrow(), expected);
    }

    #[test]
    fn test_write_during_render_defers_to_next_flush() {
        let (queue, scheduler) = setup(100);
        let p = probe(&scheduler);
        let as_dyn: Rc<dyn Renderable> = p.clone();
        {
            let scheduler = scheduler.clone();
            let weak = Rc::downgrade(&as_dyn);
            let fired = Cell::new(false);
            *p.on_render.borrow_mut() = Some(Box::new(move || {
                if !fired.replace(true) {
                    if let Some(me) = weak.upgrade() {
                        scheduler.enqueue(&me);
                    }
                }
            }));
        }
        scheduler.enqueue(&as_dyn);
        scheduler.flush();
        assert_eq!(p.renders.get(), 1);
        assert!(scheduler.is_queued(p.id));
        queue.tick();
        assert_eq!(p.renders.get(), 2);
    }

    #[test]
    fn test_removed_and_destroyed_are_skipped() {
        let (queue, scheduler) = setup(100);
        let a = probe(&scheduler);
        let b = probe(&scheduler);
        let (a_dyn, b_dyn): (Rc<dyn Renderable>, Rc<dyn Renderable>) = (a.clone(), b.clone());
        scheduler.enqueue(&a_dyn);
        scheduler.enqueue(&b_dyn);
        scheduler.remove(a.id);
        b.destroyed.set(true);
        queue.tick();
        assert_eq!((a.renders.get(), b.renders.get()), (0, 0));

        scheduler.enqueue(&b_dyn);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_depth_guard_breaks_render_loops() {
        let (queue, scheduler) = setup(3);
        let p = probe(&scheduler);
        let as_dyn: Rc<dyn Renderable> = p.clone();
        {
            let scheduler = scheduler.clone();
            let weak = Rc::downgrade(&as_dyn);
            *p.on_render.borrow_mut() = Some(Box::new(move || {
                if let Some(me) = weak.upgrade() {
                    scheduler.enqueue(&me);
                }
            }));
        }
        scheduler.enqueue(&as_dyn);
        queue.tick();
        assert_eq!(p.renders.get(), 4);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_generation_signal_tracks_flushes() {
        let (queue, scheduler) = setup(100);
        let generation = scheduler.generation_signal();
        let p = probe(&scheduler);
        let as_dyn: Rc<dyn Renderable> = p.clone();
        scheduler.enqueue(&as_dyn);
        queue.tick();
        scheduler.enqueue(&as_dyn);
        queue.tick();
        assert_eq!(generation.get(), 2);
    }
}
