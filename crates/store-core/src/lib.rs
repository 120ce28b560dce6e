//! Store Core - Foundation for the file handler
//!
//! Provides the error taxonomy, the immutable object-store configuration and
//! the value types shared by the storage transports and the file handler.

pub mod config;
pub mod error;
pub mod types;

pub use config::{RetryConfig, StoreConfig};
pub use error::{Error, Result};
pub use types::*;
