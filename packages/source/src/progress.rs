//! Progress reporting for the offline pipeline.
//!
//! Readers and the training pipeline only talk to [`ProgressCallback`];
//! the CLI renders it with `indicatif`, tests and the server pass
//! [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a long-running step.
///
/// Implementations must be `Send + Sync` so a single callback can be
/// shared through an `Arc` with blocking worker tasks.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the work as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
