//! Object store client contract used by the s3p transfer engine
//!
//! The transfer engine only needs three primitives from a remote bucket:
//!
//! - **list** the first page (at most [`MAX_LIST_KEYS`] entries) of objects under a prefix
//! - **get** an object's bytes, optionally pinned to a version
//! - **put** an object from a local file
//!
//! [`ObjectStore`] captures exactly that. Implementations must be safe to share between all the
//! worker tasks of a batch, so the engine holds them as a [`SharedStore`].
//!
//! Two implementations ship with the crate:
//!
//! - [`s3::S3Store`] talks to AWS S3 (or any S3-compatible endpoint) through `aws-sdk-s3`
//! - [`memory::MemoryStore`] keeps objects in process memory; it is what the engine's tests run
//!   against
//!
//! Errors are reported as [`anyhow::Error`] with the bucket/key in the context; the engine wraps
//! them into its own remote error variant.

pub mod memory;
pub mod s3;

/// Page size requested from the store. Keys beyond the first page are not visited.
pub const MAX_LIST_KEYS: usize = 1000;

/// One entry of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// First page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<ObjectEntry>,
    /// More keys exist beyond this page.
    pub truncated: bool,
}

/// Streaming body of a fetched object.
pub type ObjectReader = std::pin::Pin<Box<dyn tokio::io::AsyncRead + Send>>;

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> anyhow::Result<ListPage>;

    /// Fails if the key (or the requested version) does not exist.
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> anyhow::Result<ObjectReader>;

    /// Upload `body` as `key`. The file handle is consumed and closed whether or not the upload
    /// succeeds.
    async fn put_object(&self, bucket: &str, key: &str, body: tokio::fs::File)
    -> anyhow::Result<()>;
}

pub type SharedStore = std::sync::Arc<dyn ObjectStore>;
