//! Error taxonomy of the transfer engine.
//!
//! Structural errors (bad URI, conflicting arguments, missing source) are returned from `submit`
//! and abort the batch. Per-object errors are produced inside pool tasks and end up in the batch's
//! [`ErrorCollector`](crate::ErrorCollector) instead.
//!
//! The Display implementation of each variant already includes its source, so logging with `{}`
//! shows the full story.

/// Shared so that one failed `mkdir` can be reported to every task that waited on it.
pub type SharedIoError = std::sync::Arc<std::io::Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or wrong-scheme object URI
    #[error("invalid uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Path rejected by the path validator
    #[error("path {path:?} {reason}")]
    PathTraversal { path: String, reason: String },

    /// Local open/create/stat/mkdir/write failure
    #[error("{context}: {source}")]
    LocalIo {
        context: String,
        #[source]
        source: SharedIoError,
    },

    /// List/get/put failure reported by the object store
    #[error("{context}: {source:#}")]
    Remote {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// Conflicting or incomplete request arguments
    #[error("{0}")]
    Argument(String),

    /// Transfer task panicked before producing a result
    #[error("transfer panicked: {0}")]
    Panicked(String),

    /// Object store client could not be constructed
    #[error("failed to configure object store client: {0:#}")]
    Config(#[source] anyhow::Error),
}

impl Error {
    pub fn local_io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::LocalIo {
            context: context.into(),
            source: std::sync::Arc::new(source),
        }
    }

    pub fn remote(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Remote {
            context: context.into(),
            source,
        }
    }

    pub fn traversal(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathTraversal {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
