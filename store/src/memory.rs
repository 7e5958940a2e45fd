//! In-process object store.
//!
//! Behaves like a single-region S3 endpoint for the operations the engine uses: listings are
//! key-ordered and cut at [`MAX_LIST_KEYS`], versioned reads resolve against explicitly inserted
//! versions, and any key can be marked as failing to exercise error paths.

use anyhow::anyhow;
use tokio::io::AsyncReadExt;

use crate::{ListPage, MAX_LIST_KEYS, ObjectEntry, ObjectReader};

#[derive(Debug, Default, Clone)]
struct StoredObject {
    data: bytes::Bytes,
    versions: std::collections::HashMap<String, bytes::Bytes>,
}

type ObjectKey = (String, String);

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: std::sync::Mutex<std::collections::BTreeMap<ObjectKey, StoredObject>>,
    failing: std::sync::Mutex<std::collections::HashSet<String>>,
    puts: std::sync::Mutex<Vec<ObjectKey>>,
    gets: std::sync::Mutex<Vec<ObjectKey>>,
}

fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<bytes::Bytes>) {
        lock(&self.objects)
            .entry((bucket.to_string(), key.to_string()))
            .or_default()
            .data = data.into();
    }

    /// Store `data` under an explicit version id. The current (unversioned) content is left as is.
    pub fn insert_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
        data: impl Into<bytes::Bytes>,
    ) {
        lock(&self.objects)
            .entry((bucket.to_string(), key.to_string()))
            .or_default()
            .versions
            .insert(version_id.to_string(), data.into());
    }

    /// Make every get/put of `key` (in any bucket) fail.
    pub fn fail_key(&self, key: &str) {
        lock(&self.failing).insert(key.to_string());
    }

    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<bytes::Bytes> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.data.clone())
    }

    /// Every `(bucket, key)` passed to `put_object`, in call order, including failed calls.
    #[must_use]
    pub fn put_calls(&self) -> Vec<(String, String)> {
        lock(&self.puts).clone()
    }

    /// Every `(bucket, key)` passed to `get_object`, in call order, including failed calls.
    #[must_use]
    pub fn get_calls(&self) -> Vec<(String, String)> {
        lock(&self.gets).clone()
    }

    fn check_failing(&self, bucket: &str, key: &str) -> anyhow::Result<()> {
        if lock(&self.failing).contains(key) {
            return Err(anyhow!("injected failure for s3://{}/{}", bucket, key));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::ObjectStore for MemoryStore {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> anyhow::Result<ListPage> {
        let objects = lock(&self.objects);
        let mut matching = objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, key), object)| ObjectEntry {
                key: key.clone(),
                size: object.data.len() as u64,
            });
        let entries: Vec<ObjectEntry> = matching.by_ref().take(MAX_LIST_KEYS).collect();
        let truncated = matching.next().is_some();
        Ok(ListPage { entries, truncated })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> anyhow::Result<ObjectReader> {
        lock(&self.gets).push((bucket.to_string(), key.to_string()));
        self.check_failing(bucket, key)?;
        let data = {
            let objects = lock(&self.objects);
            let object = objects
                .get(&(bucket.to_string(), key.to_string()))
                .ok_or_else(|| anyhow!("no such key: s3://{}/{}", bucket, key))?;
            match version_id {
                Some(version_id) => object.versions.get(version_id).cloned().ok_or_else(|| {
                    anyhow!(
                        "no such version {:?} of s3://{}/{}",
                        version_id,
                        bucket,
                        key
                    )
                })?,
                None => object.data.clone(),
            }
        };
        Ok(Box::pin(std::io::Cursor::new(data)))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        mut body: tokio::fs::File,
    ) -> anyhow::Result<()> {
        lock(&self.puts).push((bucket.to_string(), key.to_string()));
        self.check_failing(bucket, key)?;
        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;
        self.insert(bucket, key, data);
        Ok(())
    }
}
