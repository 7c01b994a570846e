//! Logging capability passed into every pipeline call.

/// `tracing` target used by [`TracingLogger`].
pub const LOG_TARGET: &str = "cherimoya_auth";

/// Receives diagnostic traces from the verification pipeline.
pub trait AuthLogger {
    fn debug(&self, message: &str);
}

/// Forwards messages to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl AuthLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: LOG_TARGET, "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl AuthLogger for NoopLogger {
    fn debug(&self, _message: &str) {}
}

impl<F> AuthLogger for F
where
    F: Fn(&str),
{
    fn debug(&self, message: &str) {
        self(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn closures_are_loggers() {
        let seen = RefCell::new(Vec::new());
        let log = |m: &str| seen.borrow_mut().push(m.to_string());
        log.debug("one");
        AuthLogger::debug(&log, "two");
        assert_eq!(*seen.borrow(), vec!["one".to_string(), "two".to_string()]);
    }
}
