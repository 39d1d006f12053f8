//! Abort signals for bulk listener removal.
//!
//! Every listener registered with a signal is dropped once the signal's
//! controller aborts. Removal is lazy: aborted listeners are skipped during
//! dispatch and pruned the next time the listener table is touched.

use std::cell::Cell;
use std::rc::Rc;

/// Observed side of an [`AbortController`].
#[derive(Clone, Default)]
pub struct AbortSignal {
    aborted: Rc<Cell<bool>>,
}

impl AbortSignal {
    pub fn aborted(&self) -> bool {
        self.aborted.get()
    }
}

impl std::fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.aborted())
            .finish()
    }
}

/// Owner side. Aborting is one-way and idempotent; clones share one signal.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn abort(&self) {
        self.signal.aborted.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_is_shared() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.aborted());
        controller.abort();
        controller.abort();
        assert!(signal.aborted());
        assert!(controller.signal().aborted());
    }
}
