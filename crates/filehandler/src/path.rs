//! Path classification and object-store address resolution
//!
//! Both are pure: no I/O, and the only outside input is the configured
//! endpoint, passed in explicitly.

use std::fmt;

use store_core::{Error, Result};

/// Literal prefix marking an object-store path
pub const SCHEME: &str = "s3://";

/// Backend that owns a logical path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    Local,
    ObjectStore,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::Local => f.write_str("local"),
            PathKind::ObjectStore => f.write_str("s3"),
        }
    }
}

/// Classify `path` by its prefix alone
///
/// Anything starting with `s3://` (case-sensitive) is an object-store path,
/// everything else is local.
pub fn classify(path: &str) -> PathKind {
    if path.starts_with(SCHEME) {
        PathKind::ObjectStore
    } else {
        PathKind::Local
    }
}

/// Bucket and key prefix of an object-store location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAddress {
    /// Bucket name
    pub bucket: String,

    /// Directory-like key prefix, always ending in `/`. The bucket root is `/`.
    pub key_prefix: String,

    /// `s3://<endpoint>@<bucket>/<prefix>` with the configured endpoint
    pub canonical_uri: String,
}

impl StoreAddress {
    /// Build an address from its parts, normalizing the prefix
    pub fn new(bucket: impl Into<String>, prefix: &str, endpoint: &str) -> Self {
        let bucket = bucket.into();
        let key_prefix = if prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{}/", prefix)
        };

        let mut address = Self {
            bucket,
            key_prefix,
            canonical_uri: String::new(),
        };
        address.canonical_uri = format!(
            "{}{}@{}/{}",
            SCHEME,
            endpoint,
            address.bucket,
            address.object_prefix()
        );
        address
    }

    /// Prefix as sent to the store; empty for the bucket root
    pub fn object_prefix(&self) -> &str {
        if self.key_prefix == "/" {
            ""
        } else {
            &self.key_prefix
        }
    }

    /// Full object key for `filename` under this prefix
    ///
    /// A leading `/` on `filename` does not produce a doubled separator.
    pub fn object_key(&self, filename: &str) -> String {
        let filename = filename.strip_prefix('/').unwrap_or(filename);
        format!("{}{}", self.object_prefix(), filename)
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_uri)
    }
}

/// Split an `s3://bucket/prefix` path into a [`StoreAddress`]
///
/// The bucket ends at the first `/` after the scheme. An endpoint segment in
/// the input (`s3://other@bucket/...`) is discarded and replaced with
/// `endpoint`.
///
/// # Errors
/// `MalformedPath` if `path` is not an object-store path or names no bucket
pub fn resolve(path: &str, endpoint: &str) -> Result<StoreAddress> {
    let rest = path.strip_prefix(SCHEME).ok_or_else(|| Error::MalformedPath {
        path: path.to_string(),
        reason: format!("expected a path starting with {}", SCHEME),
    })?;

    let (authority, prefix) = rest.split_once('/').unwrap_or((rest, ""));
    let bucket = authority
        .rsplit_once('@')
        .map_or(authority, |(_, bucket)| bucket);

    if bucket.is_empty() {
        return Err(Error::MalformedPath {
            path: path.to_string(),
            reason: "no bucket name".to_string(),
        });
    }

    Ok(StoreAddress::new(bucket, prefix, endpoint))
}
