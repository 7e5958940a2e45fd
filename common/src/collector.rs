//! Failure bookkeeping for one batch of concurrent object transfers.
//!
//! Every task of a batch shares one [`ErrorCollector`]. It keeps the most recent error (what a
//! caller checks after `wait` to decide whether the batch failed), a bounded list of
//! `(object, error)` pairs for diagnostics, and the total number of failures.

use crate::Error;

/// Failures retained in detail; the count keeps going past this.
pub const MAX_RETAINED_FAILURES: usize = 100;

#[derive(Debug, Clone)]
pub struct Failure {
    /// `s3://bucket/key` or a local path, whichever identifies the object best
    pub object: String,
    pub error: std::sync::Arc<Error>,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.object, self.error)
    }
}

#[derive(Debug, Default)]
struct State {
    last: Option<std::sync::Arc<Error>>,
    failures: Vec<Failure>,
    count: usize,
}

#[derive(Debug, Default)]
pub struct ErrorCollector {
    state: std::sync::Mutex<State>,
}

impl ErrorCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record a failed object. Overwrites the last error.
    pub fn record(&self, object: impl Into<String>, error: Error) {
        let error = std::sync::Arc::new(error);
        {
            let mut state = self.state();
            if state.failures.len() < MAX_RETAINED_FAILURES {
                state.failures.push(Failure {
                    object: object.into(),
                    error: error.clone(),
                });
            }
        }
        self.set_last_err(error);
    }

    /// Overwrite the last error and count it, without retaining it as an object failure.
    pub fn set_last_err(&self, error: impl Into<std::sync::Arc<Error>>) {
        let mut state = self.state();
        state.count += 1;
        state.last = Some(error.into());
    }

    #[must_use]
    pub fn last_err(&self) -> Option<std::sync::Arc<Error>> {
        self.state().last.clone()
    }

    /// Retained failures, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<Failure> {
        self.state().failures.clone()
    }

    /// Total failures recorded, including those not retained.
    #[must_use]
    pub fn count(&self) -> usize {
        self.state().count
    }
}

/// Returned by `wait` when at least one object of the batch failed.
#[derive(Debug, thiserror::Error)]
#[error("{failed} object(s) failed, last error: {last}")]
pub struct BatchError {
    pub failed: usize,
    pub last: std::sync::Arc<Error>,
    pub failures: Vec<Failure>,
    pub summary: crate::progress::Summary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collector_has_no_error() {
        let collector = ErrorCollector::new();
        assert!(collector.last_err().is_none());
        assert_eq!(collector.count(), 0);
        assert!(collector.failures().is_empty());
    }

    #[test]
    fn last_error_is_overwritten() {
        let collector = ErrorCollector::new();
        collector.record("s3://b/first", Error::Argument("first".to_string()));
        collector.record("s3://b/second", Error::Argument("second".to_string()));
        assert_eq!(collector.last_err().unwrap().to_string(), "second");
        assert_eq!(collector.count(), 2);
        let objects: Vec<String> = collector
            .failures()
            .into_iter()
            .map(|failure| failure.object)
            .collect();
        assert_eq!(objects, vec!["s3://b/first", "s3://b/second"]);
    }

    #[test]
    fn retained_failures_are_bounded() {
        let collector = ErrorCollector::new();
        for i in 0..(MAX_RETAINED_FAILURES + 10) {
            collector.record(format!("obj{i}"), Error::Argument(format!("e{i}")));
        }
        assert_eq!(collector.failures().len(), MAX_RETAINED_FAILURES);
        assert_eq!(collector.count(), MAX_RETAINED_FAILURES + 10);
        assert_eq!(
            collector.last_err().unwrap().to_string(),
            format!("e{}", MAX_RETAINED_FAILURES + 9)
        );
    }

    #[test]
    fn concurrent_writers_are_all_counted() {
        let collector = std::sync::Arc::new(ErrorCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let collector = collector.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        collector.record(format!("t{t}/{i}"), Error::Argument("x".to_string()));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(collector.count(), 400);
        assert!(collector.last_err().is_some());
    }

    #[test]
    fn set_last_err_counts_without_retaining() {
        let collector = ErrorCollector::new();
        collector.record("s3://b/k", Error::Argument("first".to_string()));
        collector.set_last_err(Error::Argument("unattributed".to_string()));
        assert_eq!(collector.last_err().unwrap().to_string(), "unattributed");
        assert_eq!(collector.count(), 2);
        assert_eq!(collector.failures().len(), 1);
    }

    #[test]
    fn failure_display() {
        let failure = Failure {
            object: "s3://b/k".to_string(),
            error: std::sync::Arc::new(Error::Argument("bad".to_string())),
        };
        assert_eq!(failure.to_string(), "s3://b/k: bad");
    }
}
