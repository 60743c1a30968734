//! Catalog types shared across MediaVault crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a bucket listing: either a folder (common prefix) or a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedEntry {
    /// Display name: the last non-empty path segment.
    pub name: String,
    /// Full object key, or the common prefix for directories.
    pub path: String,
    /// Object size in bytes; zero for directories.
    pub size: u64,
    /// Last modification time. Directories carry none.
    pub modified: Option<DateTime<Utc>>,
    /// Whether this entry is a common prefix rather than an object.
    pub is_directory: bool,
}

impl ListedEntry {
    /// Build a directory entry from a common prefix such as `youth/2023/`.
    #[must_use]
    pub fn directory(prefix: impl Into<String>) -> Self {
        let path = prefix.into();
        Self {
            name: leaf_name(&path).to_owned(),
            path,
            size: 0,
            modified: None,
            is_directory: true,
        }
    }

    /// Build a file entry from an object key.
    #[must_use]
    pub fn file(key: impl Into<String>, size: u64, modified: DateTime<Utc>) -> Self {
        let path = key.into();
        Self {
            name: leaf_name(&path).to_owned(),
            path,
            size,
            modified: Some(modified),
            is_directory: false,
        }
    }
}

/// Return the last non-empty `/`-separated segment of a key or prefix.
fn leaf_name(path: &str) -> &str {
    path.split('/').rfind(|s| !s.is_empty()).unwrap_or("")
}

/// A single page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Directories first, then files, each in document order.
    pub entries: Vec<ListedEntry>,
    /// Whether the service holds more results beyond this page.
    pub is_truncated: bool,
    /// Continuation token for the next page, when truncated.
    pub next_cursor: Option<String>,
}

/// How a caller intends to use an object URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlMode {
    /// Inline playback, e.g. a `<video>` source.
    Stream,
    /// Browser download saved under the given file name.
    Download {
        /// File name suggested to the browser.
        filename: String,
    },
}
