use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::operation::Operation;

/// FIFO of render operations shared by the observer thread and the consumer.
///
/// `push` and `drain_all` take the same mutex; draining swaps the whole buffer
/// out, so an operation is either in this drain or a later one, never both.
#[derive(Debug, Default)]
pub struct OperationQueue {
    pending: Mutex<Vec<Operation>>,
    // Mirrors `pending.len()`; only written while the mutex is held.
    len_hint: AtomicUsize,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, operation: Operation) {
        let mut pending = self.pending.lock();
        pending.push(operation);
        self.len_hint.store(pending.len(), Ordering::Release);
    }

    /// Takes every queued operation in insertion order.
    pub fn drain_all(&self) -> Vec<Operation> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return Vec::new();
        }

        self.len_hint.store(0, Ordering::Release);
        std::mem::take(&mut *pending)
    }

    /// Lock-free emptiness check for the poll fast path.
    pub fn is_empty(&self) -> bool {
        self.len_hint.load(Ordering::Acquire) == 0
    }

    pub fn len(&self) -> usize {
        self.len_hint.load(Ordering::Acquire)
    }
}
