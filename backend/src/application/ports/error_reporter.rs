// Driven port - Error reporting (output port)

/// Destination for errors that are worth an operator's attention, such as
/// upstream failures. Implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorReporter: Send + Sync {
    fn report_error(&self, err: &anyhow::Error);
}
