//! File Handler - One API for files on local disk or S3-compatible stores
//!
//! Callers pass a logical base path and a filename. Paths starting with
//! `s3://` go to the configured object store, everything else to the local
//! filesystem. On top of that the handler provides:
//! - existence checks and enumeration with extension filters
//! - best-effort deletion with per-item outcomes
//! - typed reads and writes for frames, objects, JSON and text
//! - raw uploads and downloads
//!
//! # Example
//!
//! ```no_run
//! use filehandler::{FileHandler, FileQuery};
//! use store_core::StoreConfig;
//!
//! # async fn example() -> store_core::Result<()> {
//! let handler = FileHandler::new(StoreConfig::load()?);
//! handler.write_json("s3://experiments/run-1", "params.json", &serde_json::json!({"lr": 0.01})).await?;
//!
//! let listing = handler
//!     .enumerate("s3://experiments/run-1", &FileQuery::all().with_extensions([".json"]))
//!     .await?;
//! for entry in &listing.entries {
//!     println!("{}", entry.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod delete;
pub mod enumerate;
pub mod handle;
pub mod handler;
pub mod path;
pub mod session;
mod transfer;

pub use codec::{Codec, FrameCodec, FrameReadOptions, JsonCodec, ObjectCodec, TextCodec};
pub use enumerate::{ExtensionFilter, FileQuery, Listing};
pub use handle::Handle;
pub use handler::FileHandler;
pub use path::{classify, resolve, PathKind, StoreAddress};
pub use session::{Connector, S3Connector, Session, SharedStore};
