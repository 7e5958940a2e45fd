//! Concurrent bulk-transfer engine shared by the `s3p` tools
//!
//! This crate expands one transfer request (a file, a directory tree or a remote prefix) into
//! many independent object transfers and runs them on a bounded [`pool::WorkerPool`].
//!
//! # Transfers
//!
//! - [`Uploader`] - local file or directory tree to the object store
//! - [`Downloader`] - single object or first listing page of a prefix to the local filesystem
//!
//! Both follow the same protocol: any number of `submit` calls, then exactly one `wait`.
//! `submit` returns an error only for structural problems detected before anything is queued
//! (bad arguments, missing source, failed listing). Failures of individual objects are logged,
//! recorded in the batch's [`ErrorCollector`] and reported together by `wait` as a
//! [`BatchError`]; they never cancel sibling transfers.
//!
//! # Safety of local writes
//!
//! Object keys decide where downloaded files land, so every derived local path goes through
//! [`validate::validate_path`] before any I/O. Keys such as `../../etc/passwd` are rejected and
//! recorded as failures. Validation can be disabled explicitly (`--no-local-path-check`).
//!
//! Destination directories are created through the process-wide registry in [`dirs`], which
//! runs `mkdir -p` at most once per directory no matter how many tasks need it.
//!
//! # Concurrency
//!
//! The number of parallel transfers is resolved by [`jobs::resolve_jobs`]: `--jobs`, then the
//! `S3P_JOBS` environment variable, then twice the number of CPUs, clamped to ten times the
//! number of CPUs.
//!
//! # Logging
//!
//! [`run`] sets up `tracing` with verbosity taken from [`OutputConfig`] (ERROR by default,
//! `-v` INFO, `-vv` DEBUG, `-vvv` TRACE, `-q` off); `RUST_LOG` overrides it. Logs go to stderr.

pub mod batch;
pub mod collector;
pub mod config;
pub mod dirs;
pub mod download;
pub mod error;
pub mod jobs;
pub mod progress;
pub mod request;
pub mod upload;
pub mod uri;
pub mod validate;
pub mod version;

#[cfg(test)]
mod testutils;

pub use batch::Batch;
pub use collector::{BatchError, ErrorCollector, Failure};
pub use config::{OutputConfig, RuntimeConfig};
pub use download::Downloader;
pub use error::Error;
pub use progress::Summary;
pub use request::{Direction, ObjectTask, TransferRequest};
pub use upload::Uploader;
pub use uri::S3Uri;

fn init_tracing(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(output.level().into())
        .from_env_lossy();
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("failed to initialize logging: {error}");
    }
}

fn build_runtime(runtime: &RuntimeConfig) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    builder.build()
}

/// Run `func` on a freshly built tokio runtime.
///
/// Returns `None` on failure, after logging the error (and printing the partial summary of a
/// failed batch when requested). Callers exit with a non-zero status in that case.
pub fn run<Fut>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    func: impl FnOnce() -> Fut,
) -> Option<Summary>
where
    Fut: std::future::Future<Output = anyhow::Result<Summary>>,
{
    init_tracing(&output);
    let runtime = match build_runtime(&runtime) {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("failed to start tokio runtime: {}", error);
            return None;
        }
    };
    let res = runtime.block_on(func());
    match res {
        Ok(summary) => {
            if output.print_summary {
                println!("{summary}");
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("{:#}", error);
            match error.downcast_ref::<BatchError>() {
                Some(batch_error) if output.print_summary => println!("{}", batch_error.summary),
                _ => {}
            }
            None
        }
    }
}
