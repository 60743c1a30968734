use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use mediavault_core::{ListedEntry, UrlMode};

use crate::error::StoreResult;

/// Read access to a media catalog held in object storage.
///
/// Backends are interchangeable: the HTTP front only ever sees this trait.
#[async_trait]
pub trait MediaStore: fmt::Debug + Send + Sync {
    /// List one folder level under `prefix`: sub-folders first, then files.
    ///
    /// `prefix` is either empty (bucket root) or ends with `/`.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ListedEntry>>;

    /// Search the whole catalog for files whose name or path contains `pattern`.
    async fn search(&self, pattern: &str) -> StoreResult<Vec<ListedEntry>>;

    /// A URL a browser can fetch `key` from directly.
    async fn url_for(&self, key: &str, mode: &UrlMode) -> StoreResult<String>;
}

#[async_trait]
impl<T: MediaStore + ?Sized> MediaStore for Arc<T> {
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ListedEntry>> {
        (**self).list(prefix).await
    }

    async fn search(&self, pattern: &str) -> StoreResult<Vec<ListedEntry>> {
        (**self).search(pattern).await
    }

    async fn url_for(&self, key: &str, mode: &UrlMode) -> StoreResult<String> {
        (**self).url_for(key, mode).await
    }
}

/// `Content-Disposition` value asking the browser to save the object as `filename`.
#[must_use]
pub fn attachment_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename.replace('"', "'"))
}
