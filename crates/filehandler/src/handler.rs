//! Read/write/list/delete entry points
//!
//! Every call opens its own [`Session`], so a `FileHandler` can be shared
//! freely across tasks.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use serde::de::DeserializeOwned;
use serde::Serialize;
use store_core::{BatchReport, Error, Outcome, Result, StoreConfig};
use tracing::{info, instrument};

use crate::codec::{shape_frame, Codec, FrameCodec, FrameReadOptions, JsonCodec, ObjectCodec, TextCodec};
use crate::delete;
use crate::enumerate::{self, FileQuery, Listing};
use crate::handle::{build_handle, Handle};
use crate::session::{Connector, S3Connector, Session};

/// Uniform access to files on local disk or an S3-compatible store
#[derive(Clone)]
pub struct FileHandler {
    config: StoreConfig,
    connector: Arc<dyn Connector>,
}

impl FileHandler {
    /// Create a handler talking to the endpoint in `config`
    pub fn new(config: StoreConfig) -> Self {
        Self::with_connector(config, Arc::new(S3Connector))
    }

    /// Create a handler whose sessions come from `connector`
    pub fn with_connector(config: StoreConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Open a fresh session
    pub async fn session(&self) -> Result<Session> {
        Session::open(self.connector.as_ref(), &self.config).await
    }

    /// Find the files under `base` matching `query`
    pub async fn enumerate(&self, base: &str, query: &FileQuery) -> Result<Listing> {
        let session = self.session().await?;
        enumerate::enumerate(&session, base, query).await
    }

    /// Whether `filename` exists under `base`
    ///
    /// # Errors
    /// The transport error if existence could not be checked
    pub async fn exists(&self, base: &str, filename: &str) -> Result<bool> {
        let listing = self.enumerate(base, &FileQuery::named([filename])).await?;
        match listing.report.items.first().map(|item| &item.outcome) {
            Some(Outcome::Fault(reason)) => Err(Error::Storage {
                message: reason.clone(),
            }),
            _ => Ok(!listing.is_empty()),
        }
    }

    /// Delete the files under `base` selected by `query`, best effort
    pub async fn delete(&self, base: &str, query: &FileQuery) -> Result<BatchReport> {
        let session = self.session().await?;
        delete::delete(&session, base, query).await
    }

    /// Resolve the handle for `filename` under `base`
    ///
    /// Creates the directory for local bases.
    pub async fn handle(&self, base: &str, filename: &str) -> Result<Handle> {
        let session = self.session().await?;
        build_handle(&session, base, filename).await
    }

    /// Read `filename` under `base` with codec `C`
    ///
    /// # Errors
    /// `NotFound` if the file can't be confirmed to exist
    #[instrument(skip(self), fields(kind = %C::KIND))]
    pub async fn read<C: Codec>(&self, base: &str, filename: &str) -> Result<C::Value> {
        let session = self.session().await?;
        let handle = Self::existing_handle(&session, base, filename).await?;

        info!("----Download started: {} ----", filename);
        let bytes = session.read(&handle).await?;
        let value = C::decode(bytes)?;
        info!("----Download finished: {} ----", filename);

        Ok(value)
    }

    /// Write `value` to `filename` under `base` with codec `C`
    ///
    /// # Returns
    /// Number of bytes written
    #[instrument(skip(self, value), fields(kind = %C::KIND))]
    pub async fn write<C: Codec>(&self, base: &str, filename: &str, value: &C::Value) -> Result<u64> {
        let session = self.session().await?;
        let handle = build_handle(&session, base, filename).await?;
        let bytes = C::encode(value)?;

        info!("----Upload started: {} ----", filename);
        let size = session.write(&handle, bytes).await?;
        info!("----Upload finished: {} ----", filename);

        Ok(size)
    }

    pub async fn read_frame(&self, base: &str, filename: &str) -> Result<RecordBatch> {
        self.read_frame_with(base, filename, &FrameReadOptions::default())
            .await
    }

    /// Read a frame, projecting columns and enforcing a column limit
    ///
    /// A column named `index` is always dropped.
    pub async fn read_frame_with(
        &self,
        base: &str,
        filename: &str,
        options: &FrameReadOptions,
    ) -> Result<RecordBatch> {
        let frame = self.read::<FrameCodec>(base, filename).await?;
        shape_frame(frame, options, filename)
    }

    pub async fn write_frame(&self, base: &str, filename: &str, frame: &RecordBatch) -> Result<u64> {
        self.write::<FrameCodec>(base, filename, frame).await
    }

    pub async fn read_object<T>(&self, base: &str, filename: &str) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.read::<ObjectCodec<T>>(base, filename).await
    }

    pub async fn write_object<T>(&self, base: &str, filename: &str, value: &T) -> Result<u64>
    where
        T: Serialize + DeserializeOwned,
    {
        self.write::<ObjectCodec<T>>(base, filename, value).await
    }

    pub async fn read_json<T>(&self, base: &str, filename: &str) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.read::<JsonCodec<T>>(base, filename).await
    }

    pub async fn write_json<T>(&self, base: &str, filename: &str, value: &T) -> Result<u64>
    where
        T: Serialize + DeserializeOwned,
    {
        self.write::<JsonCodec<T>>(base, filename, value).await
    }

    pub async fn read_text(&self, base: &str, filename: &str) -> Result<String> {
        self.read::<TextCodec>(base, filename).await
    }

    pub async fn write_text(&self, base: &str, filename: &str, text: &str) -> Result<u64> {
        self.write::<TextCodec>(base, filename, &text.to_string()).await
    }

    /// Confirm `filename` exists under `base`, then build its handle
    ///
    /// A failed existence check does not count as missing; the read then
    /// surfaces the transport's own error.
    pub(crate) async fn existing_handle(session: &Session, base: &str, filename: &str) -> Result<Handle> {
        let listing = enumerate::enumerate(session, base, &FileQuery::named([filename])).await?;
        if listing.is_empty() {
            return Err(Error::NotFound {
                path: base.to_string(),
                filename: filename.to_string(),
            });
        }

        build_handle(session, base, filename).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SharedStore;
    use arrow::array::{ArrayRef, Int32Array, StringArray};
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::{json, Value};
    use storage::{ListPage, MemoryStore, ObjectStore};

    fn memory_handler() -> (MemoryStore, FileHandler) {
        let store = MemoryStore::new();
        store.create_bucket("bucket");
        let handler = FileHandler::with_connector(
            StoreConfig::new("store.local", "key", "secret"),
            Arc::new(SharedStore::new(store.clone())),
        );
        (store, handler)
    }

    /// Store whose existence checks fail; reads fail too when `down`
    struct Degraded {
        inner: MemoryStore,
        down: bool,
    }

    #[async_trait]
    impl ObjectStore for Degraded {
        fn name(&self) -> &'static str {
            "degraded"
        }

        async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
            if self.down {
                return Err(Error::Storage {
                    message: "503 SlowDown".to_string(),
                });
            }
            self.inner.get(bucket, key).await
        }

        async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<u64> {
            self.inner.put(bucket, key, data).await
        }

        async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
            self.inner.delete(bucket, key).await
        }

        async fn head(&self, _bucket: &str, _key: &str) -> Result<bool> {
            Err(Error::Storage {
                message: "503 SlowDown".to_string(),
            })
        }

        async fn list_page(
            &self,
            bucket: &str,
            prefix: &str,
            continuation: Option<String>,
        ) -> Result<ListPage> {
            self.inner.list_page(bucket, prefix, continuation).await
        }
    }

    fn degraded_handler(down: bool) -> (MemoryStore, FileHandler) {
        let store = MemoryStore::new();
        store.create_bucket("b");
        let handler = FileHandler::with_connector(
            StoreConfig::new("store.local", "key", "secret"),
            Arc::new(SharedStore::new(Degraded {
                inner: store.clone(),
                down,
            })),
        );
        (store, handler)
    }

    fn local_handler() -> FileHandler {
        FileHandler::new(StoreConfig::unconfigured())
    }

    #[tokio::test]
    async fn test_json_round_trip_on_store() {
        let (store, handler) = memory_handler();
        let value = json!({"a": 1});

        handler.write_json("s3://bucket/out", "out.json", &value).await.unwrap();
        assert_eq!(store.keys("bucket"), vec!["out/out.json"]);

        let read: Value = handler.read_json("s3://bucket/out", "out.json").await.unwrap();
        assert_eq!(read, value);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_store, handler) = memory_handler();

        let result = handler.read_text("s3://bucket/out", "nope.txt").await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        let dir = tempfile::tempdir().unwrap();
        let result = local_handler()
            .read_text(dir.path().to_str().unwrap(), "nope.txt")
            .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_failed_existence_check_is_not_missing() {
        let (store, handler) = degraded_handler(false);
        store.put("b", "p/a.txt", Bytes::from("hello")).await.unwrap();

        let listing = handler
            .enumerate("s3://b/p", &FileQuery::named(["a.txt"]))
            .await
            .unwrap();
        assert_eq!(listing.names(), vec!["a.txt"]);
        assert_eq!(listing.report.faults().len(), 1);

        assert_eq!(handler.read_text("s3://b/p", "a.txt").await.unwrap(), "hello");
        assert!(matches!(
            handler.exists("s3://b/p", "a.txt").await,
            Err(Error::Storage { .. })
        ));

        let report = handler
            .delete("s3://b/p", &FileQuery::named(["a.txt"]))
            .await
            .unwrap();
        assert_eq!(report.succeeded(), vec!["a.txt"]);
        assert!(store.keys("b").is_empty());
    }

    #[tokio::test]
    async fn test_read_with_store_down_is_transport_error() {
        let (store, handler) = degraded_handler(true);
        store.put("b", "p/a.txt", Bytes::from("hello")).await.unwrap();

        let result = handler.read_text("s3://b/p", "a.txt").await;
        assert!(matches!(result, Err(Error::Storage { ref message }) if message.contains("503")));
    }

    #[tokio::test]
    async fn test_text_round_trip_local() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("texts");
        let base = base.to_str().unwrap();
        let handler = local_handler();

        handler.write_text(base, "note.txt", "hello\nworld").await.unwrap();
        assert_eq!(handler.read_text(base, "note.txt").await.unwrap(), "hello\nworld");
        assert!(handler.exists(base, "note.txt").await.unwrap());
        assert!(!handler.exists(base, "other.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_frame_read_options() {
        let (_store, handler) = memory_handler();
        let frame = RecordBatch::try_from_iter(vec![
            ("index", Arc::new(Int32Array::from(vec![0, 1])) as ArrayRef),
            ("id", Arc::new(Int32Array::from(vec![7, 8])) as ArrayRef),
            ("label", Arc::new(StringArray::from(vec!["x", "y"])) as ArrayRef),
        ])
        .unwrap();

        handler.write_frame("s3://bucket/frames", "f.fth", &frame).await.unwrap();

        let read = handler.read_frame("s3://bucket/frames", "f.fth").await.unwrap();
        assert_eq!(read.num_columns(), 2);
        assert_eq!(read.num_rows(), 2);

        let options = FrameReadOptions::default().columns(["label"]).col_limit(1);
        let read = handler
            .read_frame_with("s3://bucket/frames", "f.fth", &options)
            .await
            .unwrap();
        assert_eq!(read.num_columns(), 1);
        assert_eq!(read.schema().field(0).name(), "label");
    }

    #[tokio::test]
    async fn test_store_ops_fail_without_configuration() {
        let handler = local_handler();

        let result = handler.write_text("s3://bucket/x", "a.txt", "a").await;
        assert!(matches!(result, Err(Error::StorageUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_handle_uses_configured_endpoint() {
        let (_store, handler) = memory_handler();

        let handle = handler.handle("s3://bucket/a", "b.bin").await.unwrap();
        assert_eq!(handle.to_string(), "s3://store.local@bucket/a/b.bin");
    }
}
