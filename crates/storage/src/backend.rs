//! Object-store trait definition
//!
//! Defines the async bucket/key interface every object-store transport implements.

use async_trait::async_trait;
use bytes::Bytes;
use store_core::Result;

/// One page of a key listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Full object keys, in the store's native order
    pub keys: Vec<String>,

    /// Continuation token for the next page, `None` on the last page
    pub next: Option<String>,
}

/// Async trait for bucket/key addressed object stores
///
/// Implementors provide the raw transport used by the file handler:
/// S3-compatible services, an in-memory store for tests, or a store that
/// rejects every call when no endpoint is configured.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name used in logs and errors
    fn name(&self) -> &'static str;

    /// Read the object at `bucket`/`key`
    ///
    /// # Errors
    /// Returns `StoragePathNotFound` if the key doesn't exist
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Write `data` to `bucket`/`key`, replacing any existing object
    ///
    /// # Returns
    /// Number of bytes written
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<u64>;

    /// Delete the object at `bucket`/`key`
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Check whether a single object exists
    ///
    /// # Returns
    /// `true` if the object exists, `false` if the store reports it missing
    async fn head(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Fetch one page of keys starting with `prefix`
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage>;

    /// List every key starting with `prefix`, following pagination
    ///
    /// Keys are returned in page order.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation = None;

        loop {
            let page = self.list_page(bucket, prefix, continuation).await?;
            keys.extend(page.keys);

            match page.next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(keys)
    }
}
