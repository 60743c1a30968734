use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediavault_auth::encode_key;
use mediavault_auth::canonical::uri_encode;
use mediavault_core::{ListedEntry, UrlMode};
use mediavault_xml::search_by_name_pattern;
use parking_lot::RwLock;

use crate::error::StoreResult;
use crate::store::{MediaStore, attachment_disposition};

#[derive(Debug, Clone, Copy)]
struct ObjectMeta {
    size: u64,
    modified: DateTime<Utc>,
}

/// An in-process catalog, keyed by object key.
///
/// Folder structure is derived from `/` in keys, the same way a delimiter
/// listing would report it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    base_url: String,
    objects: RwLock<BTreeMap<String, ObjectMeta>>,
}

impl MemoryStore {
    /// Create an empty store whose object URLs live under `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add or replace an object.
    pub fn insert(&self, key: impl Into<String>, size: u64, modified: DateTime<Utc>) {
        self.objects
            .write()
            .insert(key.into(), ObjectMeta { size, modified });
    }

    /// Remove an object, returning whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.objects.write().remove(key).is_some()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl MediaStore for MemoryStore {
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ListedEntry>> {
        let objects = self.objects.read();
        let mut directories = BTreeSet::new();
        let mut files = Vec::new();

        for (key, meta) in objects.range(prefix.to_owned()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            match rest.split_once('/') {
                Some((folder, _)) => {
                    directories.insert(format!("{prefix}{folder}/"));
                }
                None if !rest.is_empty() => {
                    files.push(ListedEntry::file(key.as_str(), meta.size, meta.modified));
                }
                None => {}
            }
        }

        Ok(directories
            .into_iter()
            .map(ListedEntry::directory)
            .chain(files)
            .collect())
    }

    async fn search(&self, pattern: &str) -> StoreResult<Vec<ListedEntry>> {
        let files: Vec<ListedEntry> = self
            .objects
            .read()
            .iter()
            .filter(|(key, _)| !key.ends_with('/'))
            .map(|(key, meta)| ListedEntry::file(key.as_str(), meta.size, meta.modified))
            .collect();
        Ok(search_by_name_pattern(&files, pattern))
    }

    async fn url_for(&self, key: &str, mode: &UrlMode) -> StoreResult<String> {
        let url = format!("{}/{}", self.base_url, encode_key(key.trim_start_matches('/')));
        Ok(match mode {
            UrlMode::Stream => url,
            UrlMode::Download { filename } => format!(
                "{url}?response-content-disposition={}",
                uri_encode(&attachment_disposition(filename))
            ),
        })
    }
}
