//! Progress reporting for multi-request computations.
//!
//! Baseline windows and target ranges issue one request per day, which
//! can take minutes against the remote service. [`ProgressCallback`] lets
//! the caller decide how to render that (progress bars, logs, nothing)
//! without the analytics code knowing about terminals.

use std::sync::Arc;

/// Receives progress updates from long-running fetch loops.
///
/// Implementations must be `Send + Sync` because fetches may run
/// concurrently and share one reporter through an [`Arc`].
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of requests expected.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` completed requests.
    fn inc(&self, delta: u64);

    /// Updates the message displayed alongside the indicator.
    fn set_message(&self, msg: String);

    /// Marks the work as complete with a final message.
    fn finish(&self, msg: String);

    /// Marks the work as complete and removes the indicator.
    fn finish_and_clear(&self);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
