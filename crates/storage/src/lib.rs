//! Storage - Transports underneath the file handler
//!
//! Provides the byte-level collaborators the file handler dispatches to:
//! - Local filesystem primitives ([`LocalFs`])
//! - Amazon S3 / S3-compatible object stores (with `s3` feature, on by default)
//! - An in-memory object store for tests and development
//! - A store that rejects all calls when no endpoint is configured
//!
//! # Example
//!
//! ```no_run
//! use storage::{MemoryStore, ObjectStore};
//! use bytes::Bytes;
//!
//! # async fn example() -> store_core::Result<()> {
//! let store = MemoryStore::new();
//! store.create_bucket("models");
//! store.put("models", "run-1/weights.bin", Bytes::from(vec![1, 2, 3])).await?;
//! let keys = store.list("models", "run-1/").await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod local;
mod memory;
mod unconfigured;

#[cfg(feature = "s3")]
mod s3;

pub use backend::{ListPage, ObjectStore};
pub use local::LocalFs;
pub use memory::MemoryStore;
pub use unconfigured::UnconfiguredStore;

#[cfg(feature = "s3")]
pub use s3::S3Store;
