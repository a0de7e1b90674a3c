// ── Request coalescing ──
//
// Concurrent callers sharing a key run the operation once and all observe
// that execution's result. The entry is dropped as soon as the execution
// completes, so a later call with the same key runs afresh.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::error::CoreError;

type Slot<T> = Arc<OnceCell<Result<T, CoreError>>>;

/// Per-key single-flight execution.
pub struct Coalescer<T> {
    inflight: DashMap<String, Slot<T>>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            inflight: DashMap::new(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Coalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` unless an execution for `key` is already in flight, in
    /// which case wait for it and return its outcome.
    ///
    /// If the caller driving `op` is dropped mid-flight, one of the
    /// remaining waiters runs its own `op` in its place.
    pub async fn run<F, Fut>(&self, key: &str, op: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let slot = Arc::clone(
            self.inflight
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let outcome = slot.get_or_init(op).await.clone();
        self.inflight
            .remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
        outcome
    }

    /// Keys with an execution currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }
}
