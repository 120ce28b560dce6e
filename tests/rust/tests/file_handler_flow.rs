//! End-to-end flows through `FileHandler` on local disk and an in-memory store

use std::sync::Arc;

use anyhow::Result;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use filehandler::{FileHandler, FileQuery, FrameReadOptions, SharedStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storage::{ListPage, MemoryStore, ObjectStore};
use store_core::{Error, Outcome, StoreConfig};

fn store_handler(store: &MemoryStore) -> FileHandler {
    FileHandler::with_connector(
        StoreConfig::new("minio.local:9000", "key", "secret"),
        Arc::new(SharedStore::new(store.clone())),
    )
}

fn local_handler() -> FileHandler {
    FileHandler::new(StoreConfig::unconfigured())
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct TrainingRun {
    id: u64,
    tags: Vec<String>,
    loss: Option<f64>,
}

fn sample_frame() -> RecordBatch {
    RecordBatch::try_from_iter(vec![
        ("index", Arc::new(Int64Array::from(vec![0, 1, 2])) as ArrayRef),
        ("epoch", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
        ("loss", Arc::new(Float64Array::from(vec![0.9, 0.5, 0.2])) as ArrayRef),
        ("phase", Arc::new(StringArray::from(vec!["warmup", "train", "train"])) as ArrayRef),
    ])
    .unwrap()
}

/// Write, list, read back, delete, list again
async fn write_list_read_delete(handler: &FileHandler, base: &str) -> Result<()> {
    let value = json!({"a": 1});

    handler.write_json(base, "out.json", &value).await?;

    let listing = handler.enumerate(base, &FileQuery::all()).await?;
    assert_eq!(listing.names(), vec!["out.json"]);

    let read: Value = handler.read_json(base, "out.json").await?;
    assert_eq!(read, value);

    let report = handler.delete(base, &FileQuery::named(["out.json"])).await?;
    assert_eq!(report.succeeded(), vec!["out.json"]);

    let listing = handler.enumerate(base, &FileQuery::all()).await?;
    assert!(listing.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_json_lifecycle_local() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = dir.path().join("data");
    write_list_read_delete(&local_handler(), base.to_str().unwrap()).await
}

#[tokio::test]
async fn test_json_lifecycle_store() -> Result<()> {
    let store = MemoryStore::with_page_size(1);
    store.create_bucket("data");
    write_list_read_delete(&store_handler(&store), "s3://data/runs/1").await?;
    assert!(store.keys("data").is_empty());
    Ok(())
}

async fn every_payload_kind(handler: &FileHandler, base: &str) -> Result<()> {
    let frame = sample_frame();
    handler.write_frame(base, "metrics.fth", &frame).await?;
    let read = handler.read_frame(base, "metrics.fth").await?;
    assert_eq!(read.num_rows(), 3);
    assert_eq!(read.num_columns(), 3);
    assert!(read.schema().index_of("index").is_err());

    let read = handler
        .read_frame_with(
            base,
            "metrics.fth",
            &FrameReadOptions::default().columns(["loss", "epoch"]),
        )
        .await?;
    assert_eq!(read.schema().field(0).name(), "loss");

    let run = TrainingRun {
        id: 7,
        tags: vec!["baseline".to_string()],
        loss: Some(0.2),
    };
    handler.write_object(base, "run.bin", &run).await?;
    assert_eq!(handler.read_object::<TrainingRun>(base, "run.bin").await?, run);

    handler.write_json(base, "run.json", &run).await?;
    assert_eq!(handler.read_json::<TrainingRun>(base, "run.json").await?, run);

    handler.write_text(base, "notes.txt", "line one\nline two").await?;
    assert_eq!(handler.read_text(base, "notes.txt").await?, "line one\nline two");

    let listing = handler.enumerate(base, &FileQuery::all()).await?;
    let mut names = listing.names();
    names.sort();
    assert_eq!(names, vec!["metrics.fth", "notes.txt", "run.bin", "run.json"]);

    let json_only = handler
        .enumerate(base, &FileQuery::all().with_extensions([".json", "txt"]))
        .await?;
    let mut names = json_only.names();
    names.sort();
    assert_eq!(names, vec!["notes.txt", "run.json"]);
    Ok(())
}

#[tokio::test]
async fn test_payload_kinds_local() -> Result<()> {
    let dir = tempfile::tempdir()?;
    every_payload_kind(&local_handler(), dir.path().to_str().unwrap()).await
}

#[tokio::test]
async fn test_payload_kinds_store() -> Result<()> {
    let store = MemoryStore::with_page_size(2);
    store.create_bucket("lake");
    every_payload_kind(&store_handler(&store), "s3://lake/experiments/a").await
}

#[tokio::test]
async fn test_local_delete_all() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = dir.path().join("scratch");
    let base = base.to_str().unwrap();
    let handler = local_handler();

    handler.write_text(base, "a.txt", "a").await?;
    handler.write_text(base, "nested/b.txt", "b").await?;
    assert_eq!(handler.enumerate(base, &FileQuery::all()).await?.entries.len(), 2);

    let report = handler.delete(base, &FileQuery::all()).await?;
    assert!(report.is_clean());

    assert!(handler.enumerate(base, &FileQuery::all()).await?.is_empty());

    // Deleting again is a no-op
    assert!(handler.delete(base, &FileQuery::all()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_store_delete_by_extension_spans_sub_prefixes() -> Result<()> {
    let store = MemoryStore::new();
    store.create_bucket("b");
    let handler = store_handler(&store);

    handler.write_text("s3://b/p", "keep.txt", "k").await?;
    handler.write_json("s3://b/p", "drop.json", &json!(1)).await?;
    handler.write_json("s3://b/p/inner", "drop.json", &json!(2)).await?;

    let report = handler
        .delete("s3://b/p", &FileQuery::all().with_extensions([".json"]))
        .await?;
    assert_eq!(report.succeeded().len(), 2);
    assert_eq!(store.keys("b"), vec!["p/keep.txt"]);
    Ok(())
}

#[tokio::test]
async fn test_missing_names_do_not_abort_siblings() -> Result<()> {
    let store = MemoryStore::new();
    store.create_bucket("b");
    let handler = store_handler(&store);

    handler.write_text("s3://b/p", "a.txt", "a").await?;
    handler.write_text("s3://b/p", "c.txt", "c").await?;

    let report = handler
        .delete("s3://b/p", &FileQuery::named(["a.txt", "missing.txt", "c.txt"]))
        .await?;
    assert_eq!(report.len(), 3);
    assert_eq!(report.not_found(), vec!["missing.txt"]);
    let mut deleted = report.succeeded();
    deleted.sort();
    assert_eq!(deleted, vec!["a.txt", "c.txt"]);
    assert!(store.keys("b").is_empty());

    let dir = tempfile::tempdir()?;
    let base = dir.path().to_str().unwrap();
    let handler = local_handler();
    handler.write_text(base, "a.txt", "a").await?;

    let report = handler.delete(base, &FileQuery::named(["missing.txt", "a.txt"])).await?;
    assert_eq!(report.not_found(), vec!["missing.txt"]);
    assert_eq!(report.succeeded(), vec!["a.txt"]);
    Ok(())
}

/// Wraps a store and fails deletes of keys containing `poison`
struct FlakyStore {
    inner: MemoryStore,
    poison: &'static str,
}

#[async_trait]
impl ObjectStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, bucket: &str, key: &str) -> store_core::Result<Bytes> {
        self.inner.get(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> store_core::Result<u64> {
        self.inner.put(bucket, key, data).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> store_core::Result<()> {
        if key.contains(self.poison) {
            return Err(Error::Storage {
                message: "AccessDenied".to_string(),
            });
        }
        self.inner.delete(bucket, key).await
    }

    async fn head(&self, bucket: &str, key: &str) -> store_core::Result<bool> {
        self.inner.head(bucket, key).await
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> store_core::Result<ListPage> {
        self.inner.list_page(bucket, prefix, continuation).await
    }
}

#[tokio::test]
async fn test_delete_fault_is_reported_per_item() -> Result<()> {
    let inner = MemoryStore::new();
    inner.create_bucket("b");
    let handler = FileHandler::with_connector(
        StoreConfig::new("minio.local:9000", "key", "secret"),
        Arc::new(SharedStore::new(FlakyStore {
            inner: inner.clone(),
            poison: "locked",
        })),
    );

    handler.write_text("s3://b/p", "one.txt", "1").await?;
    handler.write_text("s3://b/p", "locked.txt", "2").await?;
    handler.write_text("s3://b/p", "two.txt", "3").await?;

    let report = handler.delete("s3://b/p", &FileQuery::all()).await?;
    assert_eq!(report.succeeded().len(), 2);

    let faults = report.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].0, "locked.txt");
    assert!(faults[0].1.contains("AccessDenied"));
    assert_eq!(inner.keys("b"), vec!["p/locked.txt"]);
    Ok(())
}

#[tokio::test]
async fn test_read_missing_file_and_malformed_path() -> Result<()> {
    let store = MemoryStore::new();
    store.create_bucket("b");
    let handler = store_handler(&store);

    let result = handler.read_text("s3://b/p", "absent.txt").await;
    assert!(matches!(result, Err(Error::NotFound { .. })));

    let result = handler.enumerate("s3://", &FileQuery::all()).await;
    assert!(matches!(result, Err(Error::MalformedPath { .. })));
    Ok(())
}

#[tokio::test]
async fn test_missing_bucket_listing_is_an_error() {
    let store = MemoryStore::new();
    let result = store_handler(&store)
        .enumerate("s3://nowhere/p", &FileQuery::all())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_named_lookup_reports_outcomes() -> Result<()> {
    let store = MemoryStore::new();
    store.create_bucket("b");
    let handler = store_handler(&store);
    handler.write_text("s3://b/p", "here.txt", "x").await?;

    let listing = handler
        .enumerate("s3://b/p", &FileQuery::named(["here.txt", "gone.txt"]))
        .await?;
    assert_eq!(listing.names(), vec!["here.txt"]);
    assert_eq!(listing.report.items[1].outcome, Outcome::NotFound);
    Ok(())
}
