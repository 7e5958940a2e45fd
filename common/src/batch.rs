//! One batch of object transfers: a worker pool plus the bookkeeping its tasks share.

use futures::FutureExt;

use crate::Error;
use crate::collector::{BatchError, ErrorCollector};
use crate::progress::{Progress, Summary};

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

pub struct Batch {
    pool: pool::WorkerPool,
    errors: std::sync::Arc<ErrorCollector>,
    progress: std::sync::Arc<Progress>,
}

impl Batch {
    pub fn new(jobs: usize) -> Self {
        Self {
            pool: pool::WorkerPool::new(jobs),
            errors: std::sync::Arc::new(ErrorCollector::new()),
            progress: std::sync::Arc::new(Progress::default()),
        }
    }

    /// Queue one object transfer. `transfer` resolves to the number of bytes moved.
    pub fn submit<F>(&self, object: String, transfer: F)
    where
        F: std::future::Future<Output = Result<u64, Error>> + Send + 'static,
    {
        self.progress.objects_submitted.inc();
        let errors = self.errors.clone();
        let progress = self.progress.clone();
        self.pool.submit(async move {
            let outcome = std::panic::AssertUnwindSafe(transfer)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(Error::Panicked(panic_message(&*panic))));
            match outcome {
                Ok(bytes) => {
                    progress.objects_transferred.inc();
                    progress.bytes_transferred.add(bytes);
                }
                Err(error) => {
                    tracing::error!("error on {}: {}", object, error);
                    progress.objects_failed.inc();
                    errors.record(object, error);
                }
            }
        });
    }

    /// Record an object that failed before it could be queued.
    pub fn reject(&self, object: String, error: Error) {
        tracing::error!("error on {}: {}", object, error);
        self.progress.objects_failed.inc();
        self.errors.record(object, error);
    }

    pub fn skip(&self, object: &str, reason: &str) {
        tracing::debug!("skipping {}: {}", object, reason);
        self.progress.objects_skipped.inc();
    }

    pub fn errors(&self) -> &std::sync::Arc<ErrorCollector> {
        &self.errors
    }

    pub fn progress(&self) -> &std::sync::Arc<Progress> {
        &self.progress
    }

    /// Drain the pool and report the batch outcome.
    pub async fn wait(self) -> Result<Summary, BatchError> {
        self.pool.wait().await;
        let summary = self.progress.summary();
        match self.errors.last_err() {
            None => Ok(summary),
            Some(last) => Err(BatchError {
                failed: self.errors.count(),
                last,
                failures: self.errors.failures(),
                summary,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successes_and_failures_are_tallied() {
        let batch = Batch::new(2);
        batch.submit("a".to_string(), async { Ok(10) });
        batch.submit("b".to_string(), async { Ok(5) });
        batch.submit("c".to_string(), async {
            Err(Error::Argument("boom".to_string()))
        });
        batch.reject("d".to_string(), Error::Argument("bad key".to_string()));
        batch.skip("e/", "directory marker");
        let error = batch.wait().await.unwrap_err();
        assert_eq!(error.failed, 2);
        assert_eq!(error.summary.objects_submitted, 3);
        assert_eq!(error.summary.objects_transferred, 2);
        assert_eq!(error.summary.objects_failed, 2);
        assert_eq!(error.summary.objects_skipped, 1);
        assert_eq!(error.summary.bytes_transferred, 15);
        let objects: Vec<String> = error.failures.into_iter().map(|f| f.object).collect();
        assert!(objects.contains(&"c".to_string()));
        assert!(objects.contains(&"d".to_string()));
    }

    #[tokio::test]
    async fn panicking_transfer_is_a_failure() {
        let batch = Batch::new(2);
        batch.submit("s3://b/ok".to_string(), async { Ok(1) });
        batch.submit("s3://b/boom".to_string(), async {
            panic!("connection pool exploded")
        });
        let error = batch.wait().await.unwrap_err();
        assert_eq!(error.failed, 1);
        assert_eq!(error.failures[0].object, "s3://b/boom");
        assert!(
            matches!(&*error.last, Error::Panicked(message) if message == "connection pool exploded")
        );
        assert_eq!(error.summary.objects_submitted, 2);
        assert_eq!(error.summary.objects_transferred, 1);
        assert_eq!(error.summary.objects_failed, 1);
    }

    #[tokio::test]
    async fn clean_batch_returns_summary() {
        let batch = Batch::new(4);
        for i in 0..20 {
            batch.submit(format!("obj{i}"), async move { Ok(i) });
        }
        let summary = batch.wait().await.unwrap();
        assert_eq!(summary.objects_transferred, 20);
        assert_eq!(summary.bytes_transferred, (0..20).sum::<u64>());
    }
}
