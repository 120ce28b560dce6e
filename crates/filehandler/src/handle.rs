//! Resolved access handles
//!
//! A [`Handle`] is what codecs read from and write to: either a concrete local
//! file path or a bucket/key pair on the configured endpoint.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use store_core::{Error, Result};
use tracing::debug;

use crate::path::{classify, PathKind, SCHEME};
use crate::session::Session;

/// Fully resolved, backend-specific file address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handle {
    /// File on the local filesystem
    Local(PathBuf),

    /// Object on the configured store
    Object {
        endpoint: String,
        bucket: String,
        key: String,
    },
}

impl Handle {
    pub fn kind(&self) -> PathKind {
        match self {
            Handle::Local(_) => PathKind::Local,
            Handle::Object { .. } => PathKind::ObjectStore,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Local(path) => write!(f, "{}", path.display()),
            Handle::Object {
                endpoint,
                bucket,
                key,
            } => write!(f, "{}{}@{}/{}", SCHEME, endpoint, bucket, key),
        }
    }
}

impl FromStr for Handle {
    type Err = Error;

    /// Parse a rendered handle; `s3://<endpoint>@<bucket>/<key>` or a local path
    fn from_str(s: &str) -> Result<Self> {
        let Some(rest) = s.strip_prefix(SCHEME) else {
            return Ok(Handle::Local(PathBuf::from(s)));
        };

        let malformed = |reason: &str| Error::MalformedPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let (authority, key) = rest.split_once('/').ok_or_else(|| malformed("no object key"))?;
        let (endpoint, bucket) = authority.rsplit_once('@').unwrap_or(("", authority));

        if bucket.is_empty() {
            return Err(malformed("no bucket name"));
        }
        if key.is_empty() {
            return Err(malformed("no object key"));
        }

        Ok(Handle::Object {
            endpoint: endpoint.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

/// Build the handle for `filename` under `base`
///
/// Object-store bases are re-rendered with the session's endpoint. Local
/// bases get their directory created (recursively, idempotently) before the
/// filename is joined on.
pub async fn build_handle(session: &Session, base: &str, filename: &str) -> Result<Handle> {
    let handle = match classify(base) {
        PathKind::ObjectStore => {
            let address = session.resolve(base)?;
            Handle::Object {
                endpoint: session.endpoint().to_string(),
                key: address.object_key(filename),
                bucket: address.bucket,
            }
        }
        PathKind::Local => {
            let dir = Path::new(base);
            session.local().create_dir_all(dir).await?;
            Handle::Local(dir.join(filename))
        }
    };

    debug!(%handle, "Built handle");
    Ok(handle)
}
