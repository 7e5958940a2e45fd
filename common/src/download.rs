//! Object store -> local file or directory tree.
//!
//! A non-recursive request fetches one object. A recursive request lists the first page of keys
//! under the prefix and queues one task per key; directory markers (keys ending in `/`) are
//! skipped. Every key is checked by the path validator against the local root before anything
//! is written, and the directories each task needs are materialized through the process-wide
//! [`crate::dirs`] registry so that concurrent tasks never race on `mkdir`.
//!
//! Layout: a prefix ending in `/` mirrors the prefix's contents into the local root
//! (`dir/a.txt` -> `<local>/a.txt`); a prefix without it mirrors relative to the prefix's parent
//! (`dir/a.txt` -> `<local>/dir/a.txt`).

use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::batch::Batch;
use crate::collector::{BatchError, ErrorCollector};
use crate::progress::{Progress, Summary};
use crate::request::{Direction, ObjectTask, TransferRequest};

pub struct Downloader {
    store: store::SharedStore,
    batch: Batch,
}

/// Number of leading bytes of every listed key that do not appear in the local path.
fn strip_len(prefix: &str) -> usize {
    if prefix.ends_with('/') {
        prefix.len()
    } else {
        prefix.rfind('/').map_or(0, |pos| pos + 1)
    }
}

/// Path of `key` below the local root, `/`-separated. `None` for keys with nothing left after
/// stripping.
fn relative_path(key: &str, strip: usize) -> Option<&str> {
    let relative = key.get(strip..)?.trim_start_matches('/');
    if relative.is_empty() {
        None
    } else {
        Some(relative)
    }
}

fn path_str(path: &std::path::Path) -> std::borrow::Cow<'_, str> {
    path.to_string_lossy()
}

async fn download_object(
    store: store::SharedStore,
    task: ObjectTask,
    version_id: Option<String>,
) -> Result<u64, Error> {
    let destination = task.local_path;
    let mut reader = store
        .get_object(&task.bucket, &task.key, version_id.as_deref())
        .await
        .map_err(|error| {
            Error::remote(
                format!("failed fetching s3://{}/{}", task.bucket, task.key),
                error,
            )
        })?;
    let mut file = tokio::fs::File::create(&destination)
        .await
        .map_err(|error| Error::local_io(format!("failed creating {destination:?}"), error))?;
    let written = tokio::io::copy(&mut reader, &mut file)
        .await
        .map_err(|error| Error::local_io(format!("failed writing {destination:?}"), error))?;
    file.flush()
        .await
        .map_err(|error| Error::local_io(format!("failed writing {destination:?}"), error))?;
    tracing::info!("written {} bytes to {:?}", written, &destination);
    Ok(written)
}

impl Downloader {
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(store: store::SharedStore, jobs: usize) -> Self {
        Self {
            store,
            batch: Batch::new(jobs),
        }
    }

    /// Queue the object(s) named by `request`. Errors returned here are structural: conflicting
    /// arguments, a destination that fails validation, a file where the local root should be,
    /// or a failed listing. Per-object failures are collected and reported by
    /// [`Downloader::wait`].
    pub async fn submit(&self, request: &TransferRequest) -> Result<(), Error> {
        request.expect_direction(Direction::Download)?;
        if request.recursive {
            self.submit_prefix(request).await
        } else {
            self.submit_object(request).await
        }
    }

    async fn submit_object(&self, request: &TransferRequest) -> Result<(), Error> {
        let key = request.key.trim_end_matches('/');
        let name = key.rsplit('/').next().unwrap_or(key);
        if name.is_empty() {
            return Err(Error::Argument(format!(
                "s3://{}/{} does not name an object",
                request.bucket, request.key
            )));
        }
        let local = request.local_path.as_path();
        let destination = match tokio::fs::metadata(local).await {
            Ok(metadata) if metadata.is_dir() => local.join(name),
            _ => local.to_path_buf(),
        };
        let skip = request.skip_path_validation;
        crate::validate::validate_path(&path_str(&destination), std::path::Path::new(""), skip)?;
        crate::validate::validate_path(name, std::path::Path::new(""), skip)?;
        let task = ObjectTask {
            local_path: destination,
            bucket: request.bucket.clone(),
            key: key.to_string(),
        };
        tracing::debug!("queueing {} into {:?}", task.uri(), &task.local_path);
        self.batch.submit(
            task.uri().to_string(),
            download_object(self.store.clone(), task, request.version_id.clone()),
        );
        Ok(())
    }

    async fn submit_prefix(&self, request: &TransferRequest) -> Result<(), Error> {
        let root = request.local_path.as_path();
        let skip = request.skip_path_validation;
        crate::validate::validate_path(&path_str(root), std::path::Path::new(""), skip)?;
        match tokio::fs::metadata(root).await {
            Ok(metadata) if !metadata.is_dir() => {
                return Err(Error::local_io(
                    format!("cannot download into {root:?}"),
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "destination exists and is not a directory",
                    ),
                ));
            }
            _ => {}
        }
        let prefix = request.key.as_str();
        let page = self
            .store
            .list_objects(&request.bucket, prefix)
            .await
            .map_err(|error| {
                Error::remote(format!("failed listing s3://{}/{}", request.bucket, prefix), error)
            })?;
        if page.truncated {
            tracing::warn!(
                "listing of s3://{}/{} was truncated after {} keys, remaining objects are not downloaded",
                &request.bucket,
                prefix,
                page.entries.len()
            );
        }
        let strip = strip_len(prefix);
        for entry in page.entries {
            let uri = format!("s3://{}/{}", request.bucket, entry.key);
            if entry.key.ends_with('/') {
                self.batch.skip(&uri, "directory marker");
                continue;
            }
            let Some(relative) = relative_path(&entry.key, strip) else {
                self.batch.skip(&uri, "nothing left after removing the prefix");
                continue;
            };
            if let Err(error) = crate::validate::validate_path(relative, root, skip) {
                self.batch.reject(uri, error);
                continue;
            }
            let task = ObjectTask {
                local_path: root.join(relative),
                bucket: request.bucket.clone(),
                key: entry.key,
            };
            let directory = task
                .local_path
                .parent()
                .map_or_else(|| root.to_path_buf(), std::path::Path::to_path_buf);
            let store = self.store.clone();
            self.batch.submit(uri, async move {
                crate::dirs::ensure_dir(&directory).await?;
                download_object(store, task, None).await
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn errors(&self) -> &std::sync::Arc<ErrorCollector> {
        self.batch.errors()
    }

    #[must_use]
    pub fn progress(&self) -> &std::sync::Arc<Progress> {
        self.batch.progress()
    }

    /// Wait for every queued download to finish.
    pub async fn wait(self) -> Result<Summary, BatchError> {
        self.batch.wait().await
    }
}
