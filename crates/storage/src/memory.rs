//! In-memory object store (not persistent)
//!
//! Keeps buckets in a shared map so clones observe each other's writes. Used
//! by tests and as a stand-in for a real store during development.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use store_core::{Error, Result};
use tracing::{debug, instrument};

use crate::backend::{ListPage, ObjectStore};

/// Default number of keys returned per listing page
const DEFAULT_PAGE_SIZE: usize = 1000;

type Buckets = BTreeMap<String, BTreeMap<String, Bytes>>;

/// In-memory implementation of [`ObjectStore`]
///
/// Listing is paginated with a configurable page size so callers that follow
/// continuation tokens can be exercised without a network.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    buckets: Arc<RwLock<Buckets>>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store returning at most `page_size` keys per listing page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: page_size.max(1),
        }
    }

    /// Create an empty bucket; writes to unknown buckets fail like a real store
    pub fn create_bucket(&self, bucket: impl Into<String>) {
        self.buckets.write().entry(bucket.into()).or_default();
    }

    /// Every key currently stored in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn no_such_bucket(bucket: &str) -> Error {
        Error::Storage {
            message: format!("NoSuchBucket: {}", bucket),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let buckets = self.buckets.read();
        let objects = buckets.get(bucket).ok_or_else(|| Self::no_such_bucket(bucket))?;

        objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::StoragePathNotFound {
                path: format!("{}/{}", bucket, key),
            })
    }

    #[instrument(skip(self, data), fields(backend = "memory", size = data.len()))]
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<u64> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;

        let size = data.len() as u64;
        objects.insert(key.to_string(), data);
        debug!(key, size, "Stored object");
        Ok(size)
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;

        match objects.remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::StoragePathNotFound {
                path: format!("{}/{}", bucket, key),
            }),
        }
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn head(&self, bucket: &str, key: &str) -> Result<bool> {
        let buckets = self.buckets.read();
        let objects = buckets.get(bucket).ok_or_else(|| Self::no_such_bucket(bucket))?;
        Ok(objects.contains_key(key))
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage> {
        let buckets = self.buckets.read();
        let objects = buckets.get(bucket).ok_or_else(|| Self::no_such_bucket(bucket))?;

        // The continuation token is the last key of the previous page
        let mut matching = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| continuation.as_deref().map_or(true, |after| key.as_str() > after));

        let keys: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let next = match matching.next() {
            Some(_) => keys.last().cloned(),
            None => None,
        };

        Ok(ListPage { keys, next })
    }
}
