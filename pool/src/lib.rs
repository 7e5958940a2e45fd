//! Bounded worker pool for per-object transfer tasks
//!
//! A single `s3p get` or `s3p put` invocation can expand into thousands of independent object
//! transfers. This crate runs those transfers with a fixed upper bound on how many execute at
//! the same time, while letting the submitter enqueue work without ever waiting on it.
//!
//! # Overview
//!
//! A [`WorkerPool`] owns `capacity` worker tasks that all pull from one shared, unbounded queue:
//!
//! ```text
//! submitter ── submit() ──▶ [ queue (unbounded) ] ──▶ worker 0 ─┐
//!                                                 ├──▶ worker 1 ─┼─▶ task runs to completion
//!                                                 └──▶ worker N ─┘
//! ```
//!
//! - **`submit`** only enqueues. It never blocks the caller and applies no backpressure; the
//!   queue grows as large as the submitter makes it.
//! - **Concurrency** is bounded by the number of workers. Queued-but-not-started tasks do not
//!   count against the capacity.
//! - **`wait`** closes the queue, lets the workers drain whatever is left and returns once every
//!   task has finished. It consumes the pool, so a pool cannot be reused after a drain.
//! - **Ordering**: none. Tasks may start and complete in any order.
//!
//! # Failure Isolation
//!
//! Tasks return `()`. Reporting a failure is the task's own job (s3p tasks record into an error
//! collector). A task that panics is caught by its worker, logged, and the worker moves on to the
//! next task; sibling tasks and the pool are unaffected.
//!
//! # Cancellation
//!
//! There is no way to cancel an individual task. Dropping a pool without calling
//! [`WorkerPool::wait`] aborts its workers, which is how a batch is abandoned after a structural
//! error.
//!
//! # Example
//!
//! ```rust,no_run
//! use pool::WorkerPool;
//!
//! # async fn example() {
//! let pool = WorkerPool::new(4);
//! for i in 0..100 {
//!     pool.submit(async move {
//!         println!("task {i}");
//!     });
//! }
//! // at most 4 tasks ran at any given time
//! pool.wait().await;
//! # }
//! ```
//!
//! # Runtime
//!
//! Workers are tokio tasks, so [`WorkerPool::new`] must be called from within a tokio runtime.
//! The pool capacity is independent of the number of runtime threads: transfer tasks spend most
//! of their time waiting on network and disk I/O.

mod worker;

/// Unit of work accepted by the pool.
pub type Task = std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'static>>;

/// Fixed-capacity executor draining a shared task queue.
#[derive(Debug)]
pub struct WorkerPool {
    capacity: usize,
    sender: async_channel::Sender<Task>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `capacity` workers. A capacity of 0 is treated as 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = std::cmp::max(1, capacity);
        let (sender, receiver) = async_channel::unbounded::<Task>();
        let workers = (0..capacity)
            .map(|id| tokio::spawn(worker::run(id, receiver.clone())))
            .collect();
        tracing::debug!("worker pool started with {} workers", capacity);
        Self {
            capacity,
            sender,
            workers,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tasks waiting for a free worker.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    /// Enqueue a task. Returns immediately.
    pub fn submit<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        // the queue is unbounded and only closed by `wait`, which consumes the pool
        if let Err(error) = self.sender.try_send(Box::pin(task)) {
            tracing::error!("worker pool rejected a task: {}", error);
        }
    }

    /// Block until every submitted task has completed, then stop the workers.
    pub async fn wait(mut self) {
        self.sender.close();
        for handle in std::mem::take(&mut self.workers) {
            if let Err(error) = handle.await {
                tracing::error!("worker terminated abnormally: {}", error);
            }
        }
        tracing::debug!("worker pool drained");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // only non-empty when the pool is abandoned without `wait`
        for handle in &self.workers {
            handle.abort();
        }
    }
}
