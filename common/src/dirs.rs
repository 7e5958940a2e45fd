//! Creates each destination directory at most once, however many tasks need it.
//!
//! A recursive download of `N` keys spread over `D` directories would otherwise issue `N`
//! `create_dir_all` calls racing each other. The registry maps every absolute directory path to a
//! one-shot cell: the first caller runs the creation, everyone else for that path waits on the
//! same cell and receives the cached outcome, including a cached failure. The registry map lock
//! is only held to look up or insert a cell, never across the creation itself, so callers for
//! different directories do not serialize.
//!
//! Entries are never removed. The process-wide registry lives as long as the CLI invocation.

use crate::Error;
use crate::error::SharedIoError;

type Outcome = Result<(), SharedIoError>;
type Cell = std::sync::Arc<tokio::sync::OnceCell<Outcome>>;

#[derive(Debug, Default)]
pub struct DirRegistry {
    cells: std::sync::Mutex<std::collections::HashMap<std::path::PathBuf, Cell>>,
    attempts: std::sync::atomic::AtomicUsize,
}

static DIRECTORIES: std::sync::LazyLock<DirRegistry> = std::sync::LazyLock::new(DirRegistry::new);

/// [`DirRegistry::ensure_dir`] on the process-wide registry.
pub async fn ensure_dir(path: &std::path::Path) -> Result<(), Error> {
    DIRECTORIES.ensure_dir(path).await
}

impl DirRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `path` (and any missing ancestors) exists.
    pub async fn ensure_dir(&self, path: &std::path::Path) -> Result<(), Error> {
        let absolute = std::path::absolute(path).map_err(|error| {
            Error::local_io(format!("cannot resolve directory {path:?}"), error)
        })?;
        let cell = self.cell(&absolute);
        let outcome = cell
            .get_or_init(|| async {
                self.attempts
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                tracing::debug!("creating directory {:?}", &absolute);
                tokio::fs::create_dir_all(&absolute)
                    .await
                    .map_err(std::sync::Arc::new)
            })
            .await;
        outcome.clone().map_err(|source| Error::LocalIo {
            context: format!("cannot create directory {path:?}"),
            source,
        })
    }

    /// Number of creations actually started, across all paths.
    #[must_use]
    pub fn creation_attempts(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn cell(&self, path: &std::path::Path) -> Cell {
        let mut cells = self
            .cells
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        cells.entry(path.to_path_buf()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_create_once() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let target = tmp_dir.path().join("a").join("b").join("c");
        let registry = std::sync::Arc::new(DirRegistry::new());
        let mut join_set = tokio::task::JoinSet::new();
        for _ in 0..32 {
            let registry = registry.clone();
            let target = target.clone();
            join_set.spawn(async move { registry.ensure_dir(&target).await });
        }
        while let Some(res) = join_set.join_next().await {
            res.unwrap().unwrap();
        }
        assert_eq!(registry.creation_attempts(), 1);
        assert!(target.is_dir());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failure_is_shared_by_all_callers() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let blocker = tmp_dir.path().join("file");
        tokio::fs::write(&blocker, "not a directory").await.unwrap();
        let target = blocker.join("sub");
        let registry = std::sync::Arc::new(DirRegistry::new());
        let mut join_set = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let target = target.clone();
            join_set.spawn(async move { registry.ensure_dir(&target).await });
        }
        let mut messages = std::collections::HashSet::new();
        while let Some(res) = join_set.join_next().await {
            let error = res.unwrap().unwrap_err();
            assert!(matches!(error, Error::LocalIo { .. }));
            messages.insert(error.to_string());
        }
        assert_eq!(messages.len(), 1);
        assert_eq!(registry.creation_attempts(), 1);
        // later callers get the cached failure without retrying
        assert!(registry.ensure_dir(&target).await.is_err());
        assert_eq!(registry.creation_attempts(), 1);
    }

    #[tokio::test]
    async fn distinct_paths_are_created_independently() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let registry = DirRegistry::new();
        registry.ensure_dir(&tmp_dir.path().join("x")).await.unwrap();
        registry.ensure_dir(&tmp_dir.path().join("y/z")).await.unwrap();
        registry.ensure_dir(&tmp_dir.path().join("x")).await.unwrap();
        assert_eq!(registry.creation_attempts(), 2);
        assert!(tmp_dir.path().join("y/z").is_dir());
    }

    #[tokio::test]
    async fn existing_directory_is_success() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let registry = DirRegistry::new();
        registry.ensure_dir(tmp_dir.path()).await.unwrap();
        assert_eq!(registry.creation_attempts(), 1);
    }
}
