//! Error reporting for recoverable pipeline failures.

use crate::error::VoxcastError;

/// Trait for reporting recoverable errors from the pipeline loop.
///
/// Recognition and dispatch failures are converted to a no-op for the
/// current window; the reporter is the only place they surface.
pub trait ErrorReporter: Send + Sync {
    /// Reports a recoverable error from a pipeline stage.
    fn report(&self, stage: &str, error: &VoxcastError);
}

/// Simple error reporter that logs to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, stage: &str, error: &VoxcastError) {
        eprintln!("voxcast: [{}] {}", stage, error);
    }
}
