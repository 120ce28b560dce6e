//! Store-access sessions
//!
//! A [`Session`] pairs one object-store connection with the local filesystem
//! transport. Every top-level file handler call opens its own session through
//! a [`Connector`]; sessions are never cached or shared between calls.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use storage::{LocalFs, ObjectStore, UnconfiguredStore};
use store_core::{Result, StoreConfig};
use tracing::debug;

use crate::handle::Handle;
use crate::path::{self, StoreAddress};

/// Produces the object-store transport for a new session
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn ObjectStore>>;
}

/// Connects to the S3-compatible endpoint named in the configuration
///
/// Without a configured endpoint (or without the `s3` feature) the session
/// gets an [`UnconfiguredStore`] and every object-store call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Connector;

#[async_trait]
impl Connector for S3Connector {
    async fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
        if !config.is_configured() {
            return Ok(Arc::new(UnconfiguredStore));
        }

        Ok(connect_s3(config).await)
    }
}

#[cfg(feature = "s3")]
async fn connect_s3(config: &StoreConfig) -> Arc<dyn ObjectStore> {
    Arc::new(storage::S3Store::connect(config).await)
}

#[cfg(not(feature = "s3"))]
async fn connect_s3(_config: &StoreConfig) -> Arc<dyn ObjectStore> {
    tracing::warn!("Built without the s3 feature; object-store paths are unavailable");
    Arc::new(UnconfiguredStore)
}

/// Hands every session the same store instance
///
/// Used with [`storage::MemoryStore`] in tests and local development.
#[derive(Clone)]
pub struct SharedStore(Arc<dyn ObjectStore>);

impl SharedStore {
    pub fn new(store: impl ObjectStore + 'static) -> Self {
        Self(Arc::new(store))
    }
}

#[async_trait]
impl Connector for SharedStore {
    async fn connect(&self, _config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
        Ok(self.0.clone())
    }
}

/// Transports for a single top-level operation
pub struct Session {
    store: Arc<dyn ObjectStore>,
    local: LocalFs,
    endpoint: String,
}

impl Session {
    /// Open a session for `config` through `connector`
    pub async fn open(connector: &dyn Connector, config: &StoreConfig) -> Result<Self> {
        let store = connector.connect(config).await?;
        debug!(store = store.name(), "Opened session");

        Ok(Self {
            store,
            local: LocalFs::new(),
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn local(&self) -> &LocalFs {
        &self.local
    }

    /// Endpoint embedded in canonical URIs
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve an object-store path against this session's endpoint
    pub fn resolve(&self, path: &str) -> Result<StoreAddress> {
        path::resolve(path, &self.endpoint)
    }

    /// Read all bytes behind `handle`
    pub async fn read(&self, handle: &Handle) -> Result<Bytes> {
        match handle {
            Handle::Local(path) => self.local.read(path).await,
            Handle::Object { bucket, key, .. } => self.store.get(bucket, key).await,
        }
    }

    /// Replace the content behind `handle` with `data`
    pub async fn write(&self, handle: &Handle, data: Bytes) -> Result<u64> {
        match handle {
            Handle::Local(path) => self.local.write(path, data).await,
            Handle::Object { bucket, key, .. } => self.store.put(bucket, key, data).await,
        }
    }

    /// Whether a local file exists
    pub(crate) async fn local_exists(&self, path: &Path) -> bool {
        self.local.exists(path).await
    }
}
