//! Local file or directory tree -> object store.
//!
//! A single file becomes one task with key `prefix/basename`. A directory is walked depth-first
//! and every regular file becomes one task, keyed by its path relative to the parent of the
//! walked root, so uploading `data/` under `backup` produces `backup/data/...`. The walk only
//! queues work; opening and sending files happens on the worker pool.

use async_recursion::async_recursion;

use crate::Error;
use crate::batch::Batch;
use crate::collector::{BatchError, ErrorCollector};
use crate::progress::{Progress, Summary};
use crate::request::{Direction, ObjectTask, TransferRequest};

pub struct Uploader {
    store: store::SharedStore,
    batch: Batch,
}

struct Walk<'a> {
    bucket: &'a str,
    prefix: &'a str,
    base: &'a std::path::Path,
    skip_validation: bool,
}

/// Directory whose path is stripped from every uploaded file to form its key.
fn key_base(root: &std::path::Path) -> &std::path::Path {
    match (root.file_name(), root.parent()) {
        (Some(_), Some(parent)) => parent,
        _ => root,
    }
}

/// `prefix` joined with the `/`-separated components of `relative`.
fn remote_key(prefix: &str, relative: &std::path::Path) -> Result<String, Error> {
    let mut parts = Vec::new();
    for component in relative.components() {
        if let std::path::Component::Normal(name) = component {
            let name = name.to_str().ok_or_else(|| {
                Error::local_io(
                    format!("cannot map {relative:?} to an object key"),
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "file name is not valid UTF-8",
                    ),
                )
            })?;
            parts.push(name);
        }
    }
    let name = parts.join("/");
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        Ok(name)
    } else {
        Ok(format!("{prefix}/{name}"))
    }
}

async fn upload_file(store: store::SharedStore, task: ObjectTask) -> Result<u64, Error> {
    let path = &task.local_path;
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|error| Error::local_io(format!("failed opening {path:?}"), error))?;
    let size = file
        .metadata()
        .await
        .map_err(|error| Error::local_io(format!("failed reading metadata from {path:?}"), error))?
        .len();
    store
        .put_object(&task.bucket, &task.key, file)
        .await
        .map_err(|error| {
            Error::remote(format!("failed uploading {path:?} to {}", task.uri()), error)
        })?;
    tracing::info!("uploaded {:?} to {}", path, task.uri());
    Ok(size)
}

impl Uploader {
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(store: store::SharedStore, jobs: usize) -> Self {
        Self {
            store,
            batch: Batch::new(jobs),
        }
    }

    /// Queue every file of `request`. Errors returned here are structural (missing source,
    /// conflicting arguments, unreadable root directory); per-file failures are collected and
    /// reported by [`Uploader::wait`].
    pub async fn submit(&self, request: &TransferRequest) -> Result<(), Error> {
        request.expect_direction(Direction::Upload)?;
        let root = request.local_path.as_path();
        let metadata = tokio::fs::metadata(root)
            .await
            .map_err(|error| Error::local_io(format!("failed reading metadata from {root:?}"), error))?;
        let walk = Walk {
            bucket: &request.bucket,
            prefix: &request.key,
            base: key_base(root),
            skip_validation: request.skip_path_validation,
        };
        if metadata.is_dir() {
            if !request.recursive {
                return Err(Error::Argument(format!(
                    "{root:?} is a directory, recursive upload required"
                )));
            }
            tracing::debug!("walking {:?}", root);
            self.walk_dir(&walk, root, true).await
        } else {
            self.submit_file(&walk, root);
            Ok(())
        }
    }

    fn submit_file(&self, walk: &Walk<'_>, path: &std::path::Path) {
        let object = path.display().to_string();
        let relative = path.strip_prefix(walk.base).unwrap_or(path);
        let key = match remote_key(walk.prefix, relative).and_then(|key| {
            crate::validate::validate_path(&key, std::path::Path::new(""), walk.skip_validation)
                .map(|()| key)
        }) {
            Ok(key) => key,
            Err(error) => {
                self.batch.reject(object, error);
                return;
            }
        };
        let task = ObjectTask {
            local_path: path.to_path_buf(),
            bucket: walk.bucket.to_string(),
            key,
        };
        tracing::debug!("queueing {:?} as {}", path, task.uri());
        self.batch.submit(object, upload_file(self.store.clone(), task));
    }

    #[async_recursion]
    async fn walk_dir<'w>(
        &self,
        walk: &Walk<'w>,
        dir: &std::path::Path,
        is_root: bool,
    ) -> Result<(), Error> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(error) => {
                let error = Error::local_io(format!("cannot open directory {dir:?} for reading"), error);
                if is_root {
                    return Err(error);
                }
                self.batch.reject(dir.display().to_string(), error);
                return Ok(());
            }
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(error) => {
                    self.batch.reject(
                        dir.display().to_string(),
                        Error::local_io(format!("failed traversing directory {dir:?}"), error),
                    );
                    break;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(error) => {
                    self.batch.reject(
                        path.display().to_string(),
                        Error::local_io(format!("failed reading metadata from {path:?}"), error),
                    );
                    continue;
                }
            };
            if file_type.is_dir() {
                self.walk_dir(walk, &path, false).await?;
                continue;
            }
            if file_type.is_symlink() {
                // uploaded as the file it points to; linked directories are not followed
                match tokio::fs::metadata(&path).await {
                    Ok(target) if target.is_file() => {}
                    Ok(_) => {
                        tracing::warn!("not following symlink {:?} to a directory", &path);
                        self.batch.skip(&path.display().to_string(), "symlink to a directory");
                        continue;
                    }
                    Err(error) => {
                        self.batch.reject(
                            path.display().to_string(),
                            Error::local_io(format!("failed resolving symlink {path:?}"), error),
                        );
                        continue;
                    }
                }
            } else if !file_type.is_file() {
                self.batch.skip(&path.display().to_string(), "not a regular file");
                continue;
            }
            self.submit_file(walk, &path);
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

    /// Wait for every queued upload to finish.
    pub async fn wait(self) -> Result<Summary, BatchError> {
        self.batch.wait().await
    }
}
