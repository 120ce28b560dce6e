//! Value types shared by the file handler and its callers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A file discovered or confirmed at a base location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Bare file name, no path component
    pub name: String,

    /// Path of the file relative to the base location it was found under.
    /// Equal to `name` for files directly under the base.
    pub relative: String,
}

impl FileEntry {
    /// Entry for a file directly under the base location
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            relative: name.clone(),
            name,
        }
    }

    /// Entry for a file nested below the base location
    pub fn nested(relative: impl Into<String>) -> Self {
        let relative = relative.into();
        let name = match relative.rfind(['/', '\\']) {
            Some(idx) => relative[idx + 1..].to_string(),
            None => relative.clone(),
        };
        Self { name, relative }
    }

    /// Suffix after the last `.`, including the dot
    pub fn extension(&self) -> Option<&str> {
        self.name.rfind('.').map(|idx| &self.name[idx..])
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative)
    }
}

/// Result of a single item inside a batch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The item was confirmed or processed
    Success,

    /// The item does not exist
    NotFound,

    /// The backend failed for this item
    Fault(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("ok"),
            Outcome::NotFound => f.write_str("not found"),
            Outcome::Fault(reason) => write!(f, "fault: {}", reason),
        }
    }
}

/// Outcome of one named item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub name: String,
    pub outcome: Outcome,
}

/// Aggregated per-item outcomes of a best-effort batch operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for `name`
    pub fn record(&mut self, name: impl Into<String>, outcome: Outcome) {
        self.items.push(ItemReport {
            name: name.into(),
            outcome,
        });
    }

    /// Append every item of `other`
    pub fn extend(&mut self, other: BatchReport) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Names of items that succeeded
    pub fn succeeded(&self) -> Vec<&str> {
        self.names_where(|o| matches!(o, Outcome::Success))
    }

    /// Names of items that were not found
    pub fn not_found(&self) -> Vec<&str> {
        self.names_where(|o| matches!(o, Outcome::NotFound))
    }

    /// Names and reasons of items that faulted
    pub fn faults(&self) -> Vec<(&str, &str)> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                Outcome::Fault(reason) => Some((item.name.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// True when no item faulted
    pub fn is_clean(&self) -> bool {
        self.faults().is_empty()
    }

    fn names_where(&self, pred: impl Fn(&Outcome) -> bool) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| pred(&item.outcome))
            .map(|item| item.name.as_str())
            .collect()
    }
}

/// Payload kinds the file handler knows how to encode and decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Columnar table (Arrow IPC file, a.k.a. Feather v2)
    TabularFrame,

    /// Arbitrary serialized object
    GenericObject,

    /// JSON document
    Json,

    /// UTF-8 text
    Text,
}

impl PayloadKind {
    /// Conventional file extension, including the dot
    pub fn extension(&self) -> &'static str {
        match self {
            PayloadKind::TabularFrame => ".fth",
            PayloadKind::GenericObject => ".bin",
            PayloadKind::Json => ".json",
            PayloadKind::Text => ".txt",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::TabularFrame => "frame",
            PayloadKind::GenericObject => "object",
            PayloadKind::Json => "json",
            PayloadKind::Text => "text",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_entry_nested() {
        let entry = FileEntry::nested("a/b/c.json");
        assert_eq!(entry.name, "c.json");
        assert_eq!(entry.relative, "a/b/c.json");
        assert_eq!(entry.extension(), Some(".json"));

        let entry = FileEntry::new("README");
        assert_eq!(entry.relative, "README");
        assert_eq!(entry.extension(), None);
    }

    #[test]
    fn test_batch_report() {
        let mut report = BatchReport::new();
        report.record("a", Outcome::Success);
        report.record("b", Outcome::NotFound);
        report.record("c", Outcome::Fault("denied".to_string()));

        assert_eq!(report.len(), 3);
        assert_eq!(report.succeeded(), vec!["a"]);
        assert_eq!(report.not_found(), vec!["b"]);
        assert_eq!(report.faults(), vec![("c", "denied")]);
        assert!(!report.is_clean());
    }
}
