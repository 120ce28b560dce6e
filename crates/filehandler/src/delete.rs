//! Best-effort deletion
//!
//! Deletion is never atomic: every target is removed on its own and a failure
//! only marks that target in the returned [`BatchReport`]. The only errors
//! raised are for malformed base paths and a failing top-level listing.

use std::collections::HashSet;
use std::path::Path;

use store_core::{BatchReport, ItemReport, Outcome, Result};
use tracing::{debug, info, instrument, warn};

use crate::enumerate::{enumerate, enumerate_store, Depth, FileQuery};
use crate::path::{classify, PathKind, StoreAddress};
use crate::session::Session;

/// Report name used when the base location itself was removed
pub const BASE_ITEM: &str = ".";

/// Delete the files under `base` selected by `query`
///
/// Item names in the report are paths relative to `base`.
///
/// - object store, no names: every sub-prefix below `base` is discovered and
///   its direct children matching the extension filter are deleted one by one
/// - local, no names and no filter: the whole directory tree is removed
/// - otherwise the matching files are enumerated and deleted one by one
#[instrument(skip(session, query), fields(names = ?query.names))]
pub async fn delete(session: &Session, base: &str, query: &FileQuery) -> Result<BatchReport> {
    let report = match classify(base) {
        PathKind::ObjectStore => {
            let address = session.resolve(base)?;
            if query.names.is_none() {
                delete_store_tree(session, &address, query).await?
            } else {
                delete_store_named(session, &address, query).await?
            }
        }
        PathKind::Local => {
            let dir = Path::new(base);
            if !session.local_exists(dir).await {
                info!(path = %base, "Nothing to delete");
                BatchReport::new()
            } else if query.is_unfiltered() {
                delete_local_tree(session, dir).await
            } else {
                delete_local_named(session, base, query).await?
            }
        }
    };

    debug!(
        deleted = report.succeeded().len(),
        faults = report.faults().len(),
        "Deletion finished"
    );
    Ok(report)
}

/// Distinct sub-prefixes ("directories") of `keys`, in first-seen order
///
/// Root-level keys only count when the listing itself started at the bucket root.
fn sub_prefixes(keys: &[String], include_root: bool) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.iter()
        .map(|key| match key.rfind('/') {
            Some(idx) => &key[..=idx],
            None => "",
        })
        .filter(|prefix| include_root || !prefix.is_empty())
        .filter(|prefix| seen.insert(*prefix))
        .map(String::from)
        .collect()
}

async fn delete_store_tree(
    session: &Session,
    address: &StoreAddress,
    query: &FileQuery,
) -> Result<BatchReport> {
    let keys = session
        .store()
        .list(&address.bucket, address.object_prefix())
        .await?;
    let prefixes = sub_prefixes(&keys, address.object_prefix().is_empty());
    debug!(count = prefixes.len(), "Discovered sub-prefixes");

    let mut report = BatchReport::new();
    for prefix in prefixes {
        let sub_address = StoreAddress::new(address.bucket.as_str(), &prefix, session.endpoint());

        let listing = match enumerate_store(session, &sub_address, query, Depth::Direct).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(prefix = %prefix, error = %e, "Failed to list sub-prefix");
                report.record(relative_name(address, &prefix), Outcome::Fault(e.to_string()));
                continue;
            }
        };

        for entry in listing.entries {
            let key = sub_address.object_key(&entry.name);
            let outcome = delete_object(session, &sub_address.bucket, &key).await;
            report.record(relative_name(address, &key), outcome);
        }
    }

    Ok(report)
}

/// Report name for `key`: its path below the base prefix, `.` for the base itself
fn relative_name(address: &StoreAddress, key: &str) -> String {
    match key.strip_prefix(address.object_prefix()).unwrap_or(key) {
        "" => BASE_ITEM.to_string(),
        relative => relative.to_string(),
    }
}

/// Keep only the candidates validation confirmed missing
///
/// Candidates whose existence check failed are still attempted and get their own item.
fn missing_candidates(listing_report: BatchReport) -> impl Iterator<Item = ItemReport> {
    listing_report
        .items
        .into_iter()
        .filter(|item| item.outcome == Outcome::NotFound)
}

async fn delete_store_named(
    session: &Session,
    address: &StoreAddress,
    query: &FileQuery,
) -> Result<BatchReport> {
    let listing = enumerate_store(session, address, query, Depth::Recursive).await?;

    let mut report = BatchReport::new();
    report.items.extend(missing_candidates(listing.report));

    for entry in listing.entries {
        let key = address.object_key(&entry.relative);
        let outcome = delete_object(session, &address.bucket, &key).await;
        report.record(entry.relative, outcome);
    }

    Ok(report)
}

async fn delete_object(session: &Session, bucket: &str, key: &str) -> Outcome {
    match session.store().delete(bucket, key).await {
        Ok(()) => {
            debug!(bucket, key, "Deleted object");
            Outcome::Success
        }
        Err(e) if e.is_not_found() => {
            warn!(bucket, key, error = %e, "Failed to delete: object not found");
            Outcome::NotFound
        }
        Err(e) => {
            warn!(bucket, key, error = %e, "Failed to delete object");
            Outcome::Fault(e.to_string())
        }
    }
}

async fn delete_local_tree(session: &Session, dir: &Path) -> BatchReport {
    let mut report = BatchReport::new();

    match session.local().remove_dir_all(dir).await {
        Ok(()) => report.record(BASE_ITEM, Outcome::Success),
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Failed to delete directory");
            report.record(BASE_ITEM, Outcome::Fault(e.to_string()));
        }
    }

    report
}

async fn delete_local_named(session: &Session, base: &str, query: &FileQuery) -> Result<BatchReport> {
    let listing = enumerate(session, base, query).await?;

    let mut report = BatchReport::new();
    report.items.extend(missing_candidates(listing.report));

    for entry in listing.entries {
        let path = Path::new(base).join(&entry.relative);
        let outcome = match session.local().remove_file(&path).await {
            Ok(()) => Outcome::Success,
            Err(e) if e.is_not_found() => {
                warn!(filename = %entry.relative, error = %e, "Failed to delete: file not found");
                Outcome::NotFound
            }
            Err(e) => {
                warn!(filename = %entry.relative, error = %e, "Failed to delete file");
                Outcome::Fault(e.to_string())
            }
        };
        report.record(entry.relative, outcome);
    }

    Ok(report)
}
