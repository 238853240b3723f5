//! Stage-level progress reporting.
//!
//! The pipeline only knows how many stages it has and which one is running.
//! How that is shown (a terminal bar, nothing at all) is up to the caller.

use std::sync::Arc;

/// Receives progress updates while the cleaning stages run.
pub trait ProgressCallback: Send + Sync {
    /// Total number of units (stages, batches) that will be reported.
    fn set_total(&self, total: u64);

    /// Marks `delta` more units as done.
    fn inc(&self, delta: u64);

    /// Names the unit currently being worked on.
    fn set_message(&self, msg: String);

    /// Reports completion.
    fn finish(&self, msg: String);
}

/// Discards every update. Used by tests and non-interactive callers.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
