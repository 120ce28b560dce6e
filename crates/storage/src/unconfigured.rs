//! Placeholder store used when no object-store endpoint is configured

use async_trait::async_trait;
use bytes::Bytes;
use store_core::{Error, Result};
use tracing::warn;

use crate::backend::{ListPage, ObjectStore};

/// Object store that fails every call with `StorageUnavailable`
///
/// Lets a process without credentials keep working on local paths while any
/// `s3://` access fails at the transport layer instead of at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredStore;

impl UnconfiguredStore {
    fn unavailable(operation: &str, bucket: &str) -> Error {
        warn!(%operation, %bucket, "Object store is not configured");
        Error::StorageUnavailable {
            backend: "s3 (no endpoint configured)".to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for UnconfiguredStore {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn get(&self, bucket: &str, _key: &str) -> Result<Bytes> {
        Err(Self::unavailable("get", bucket))
    }

    async fn put(&self, bucket: &str, _key: &str, _data: Bytes) -> Result<u64> {
        Err(Self::unavailable("put", bucket))
    }

    async fn delete(&self, bucket: &str, _key: &str) -> Result<()> {
        Err(Self::unavailable("delete", bucket))
    }

    async fn head(&self, bucket: &str, _key: &str) -> Result<bool> {
        Err(Self::unavailable("head", bucket))
    }

    async fn list_page(
        &self,
        bucket: &str,
        _prefix: &str,
        _continuation: Option<String>,
    ) -> Result<ListPage> {
        Err(Self::unavailable("list", bucket))
    }
}
