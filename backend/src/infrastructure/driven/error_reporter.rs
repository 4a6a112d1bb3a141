use tracing::error;

use crate::application::ports::ErrorReporter;

/// Reports errors to the log. The default when no external error tracker is
/// configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report_error(&self, err: &anyhow::Error) {
        error!("[report] {err:#}");
    }
}
