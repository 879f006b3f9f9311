//! Progress reporting for mirror and prune runs.
//!
//! Runs are unattended (cron, CI), so progress is always structured logging.

mod logging;

use std::sync::Arc;

use forgemirror::ProgressCallback;

pub use logging::LoggingReporter;

impl LoggingReporter {
    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| {
            reporter.handle(event);
        })
    }
}
