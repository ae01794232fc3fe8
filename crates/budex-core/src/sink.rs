//! Error sinks
//!
//! The public data-access surface never returns errors from its convenience
//! constructors. Failures are handed to an [`ErrorSink`] and the caller gets an
//! empty result. The sink is injected, so tests can observe what was reported.

use crate::BudexError;
use parking_lot::Mutex;

/// Receiver of errors swallowed at the public boundary
pub trait ErrorSink: Send + Sync {
    fn fail(&self, error: &BudexError);
}

/// Reports errors through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn fail(&self, error: &BudexError) {
        tracing::error!(error = %error, "data access failed");
    }
}

/// Records every reported error
#[derive(Debug, Default)]
pub struct CollectingSink {
    errors: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of errors reported so far
    pub fn count(&self) -> usize {
        self.errors.lock().len()
    }

    /// Messages of every reported error, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn clear(&self) {
        self.errors.lock().clear();
    }
}

impl ErrorSink for CollectingSink {
    fn fail(&self, error: &BudexError) {
        self.errors.lock().push(error.to_string());
    }
}

/// Swallow a `Result` into an `Option`, reporting the error
pub trait ResultExt<T> {
    fn or_report(self, sink: &dyn ErrorSink) -> Option<T>;
}

impl<T> ResultExt<T> for crate::Result<T> {
    fn or_report(self, sink: &dyn ErrorSink) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                sink.fail(&error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_report_counts_failures() {
        let sink = CollectingSink::new();
        let ok: crate::Result<i32> = Ok(1);
        assert_eq!(ok.or_report(&sink), Some(1));
        assert_eq!(sink.count(), 0);

        let err: crate::Result<i32> = Err(BudexError::NotFound("Accounts".into()));
        assert_eq!(err.or_report(&sink), None);
        assert_eq!(sink.count(), 1);
        assert_eq!(sink.messages(), vec!["Not found: Accounts".to_string()]);
    }
}
