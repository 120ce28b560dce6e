//! Existence checks and file enumeration
//!
//! Two modes:
//! - **validation**: the query names candidate files; each one is checked and
//!   every candidate not confirmed missing comes back. Missing candidates and
//!   failed checks are logged and recorded in the report, never raised.
//! - **listing**: no candidates; everything under the base location is
//!   returned (paginated store listing or recursive directory walk).
//!
//! Either mode then applies the optional extension filter. No sorting is
//! applied: validation keeps candidate order, listing keeps the backend order.

use std::collections::BTreeSet;
use std::path::Path;

use store_core::{BatchReport, FileEntry, Outcome, Result};
use tracing::{debug, info, instrument, warn};

use crate::path::{classify, PathKind, StoreAddress};
use crate::session::Session;

/// Set of accepted file suffixes, e.g. `.json`, `.fth`
///
/// Matching is case-sensitive against the suffix after the last `.` of the
/// file name. A name without a `.` never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter(BTreeSet<String>);

impl ExtensionFilter {
    /// Build a filter; suffixes given without a leading `.` get one
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            extensions
                .into_iter()
                .map(Into::into)
                .map(|ext| {
                    if ext.starts_with('.') {
                        ext
                    } else {
                        format!(".{}", ext)
                    }
                })
                .collect(),
        )
    }

    pub fn matches(&self, name: &str) -> bool {
        name.rfind('.')
            .map(|idx| &name[idx..])
            .is_some_and(|ext| self.0.contains(ext))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What to look for under a base location
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    /// Candidate file names; `None` lists everything
    pub names: Option<Vec<String>>,

    /// Optional suffix filter
    pub extensions: Option<ExtensionFilter>,
}

impl FileQuery {
    /// Everything under the base
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the given candidates, if they exist
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
            extensions: None,
        }
    }

    /// Restrict the result to the given suffixes
    ///
    /// An empty suffix list leaves the query unfiltered.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter = ExtensionFilter::new(extensions);
        self.extensions = (!filter.is_empty()).then_some(filter);
        self
    }

    fn filter(&self) -> Option<&ExtensionFilter> {
        self.extensions.as_ref().filter(|filter| !filter.is_empty())
    }

    /// True when neither names nor extensions narrow the query
    pub fn is_unfiltered(&self) -> bool {
        self.names.is_none() && self.filter().is_none()
    }

    fn accepts(&self, name: &str) -> bool {
        self.filter().map_or(true, |filter| filter.matches(name))
    }
}

/// Result of an enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Files found (or not confirmed missing), in validation or backend order
    pub entries: Vec<FileEntry>,

    /// One item per candidate in validation mode; empty in listing mode
    pub report: BatchReport,
}

impl Listing {
    /// Bare names of the entries
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How deep a store listing reaches below the prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Depth {
    /// Every key below the prefix
    Recursive,
    /// Only keys directly under the prefix
    Direct,
}

/// Find the files under `base` matching `query`
///
/// # Errors
/// `MalformedPath` for an object-store base without a bucket; a failing
/// listing request. Per-candidate failures are reported, not raised.
#[instrument(skip(session, query), fields(names = ?query.names))]
pub async fn enumerate(session: &Session, base: &str, query: &FileQuery) -> Result<Listing> {
    let listing = match classify(base) {
        PathKind::ObjectStore => {
            let address = session.resolve(base)?;
            enumerate_store(session, &address, query, Depth::Recursive).await?
        }
        PathKind::Local => enumerate_local(session, Path::new(base), query).await?,
    };

    info!(filenames = ?listing.names(), "Returning filenames");
    Ok(listing)
}

pub(crate) async fn enumerate_store(
    session: &Session,
    address: &StoreAddress,
    query: &FileQuery,
    depth: Depth,
) -> Result<Listing> {
    let mut listing = Listing::default();

    match &query.names {
        Some(names) => {
            for name in names {
                let key = address.object_key(name);
                let outcome = match session.store().head(&address.bucket, &key).await {
                    Ok(true) => Outcome::Success,
                    Ok(false) => {
                        warn!(filename = %name, "{} does not exist!", name);
                        Outcome::NotFound
                    }
                    Err(e) => {
                        warn!(filename = %name, error = %e, "Existence check failed");
                        Outcome::Fault(e.to_string())
                    }
                };

                // Only a confirmed miss drops the candidate
                if outcome != Outcome::NotFound {
                    listing.entries.push(FileEntry::nested(name.as_str()));
                }
                listing.report.record(name.as_str(), outcome);
            }
        }
        None => {
            let prefix = address.object_prefix();
            let keys = session.store().list(&address.bucket, prefix).await?;
            if keys.is_empty() {
                info!(bucket = %address.bucket, prefix, "No files in the object store were found");
            }

            for key in keys {
                let relative = key.strip_prefix(prefix).unwrap_or(&key);
                let name = &key[key.rfind('/').map_or(0, |idx| idx + 1)..];

                // Empty name: the prefix's own directory marker
                if name.is_empty() {
                    continue;
                }
                if depth == Depth::Direct && relative.contains('/') {
                    continue;
                }

                listing.entries.push(FileEntry {
                    name: name.to_string(),
                    relative: relative.to_string(),
                });
            }
        }
    }

    listing.entries.retain(|entry| query.accepts(&entry.name));
    debug!(count = listing.entries.len(), "Enumerated object store");
    Ok(listing)
}

async fn enumerate_local(session: &Session, base: &Path, query: &FileQuery) -> Result<Listing> {
    let mut listing = Listing::default();

    match &query.names {
        Some(names) => {
            for name in names {
                if session.local_exists(&base.join(name)).await {
                    listing.entries.push(FileEntry::nested(name.as_str()));
                    listing.report.record(name.as_str(), Outcome::Success);
                } else {
                    warn!(filename = %name, "{} does not exist!", name);
                    listing.report.record(name.as_str(), Outcome::NotFound);
                }
            }
        }
        None => {
            listing.entries = session
                .local()
                .walk(base)
                .await?
                .into_iter()
                .map(FileEntry::nested)
                .collect();
        }
    }

    listing.entries.retain(|entry| query.accepts(&entry.name));
    debug!(count = listing.entries.len(), "Enumerated local directory");
    Ok(listing)
}
