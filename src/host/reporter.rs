use crate::error::ReplayError;
use log::error;

/// Receives failures that a host surfaces to its operator.
///
/// Passed explicitly to sessions and registries so nothing in the crate
/// depends on a process-wide error hook.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, error: &ReplayError);
}

/// Forwards reports to the `log` facade at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, context: &str, error: &ReplayError) {
        error!("{}: {}", context, error);
    }
}
