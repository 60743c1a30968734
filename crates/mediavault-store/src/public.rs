use async_trait::async_trait;
use mediavault_auth::encode_key;
use mediavault_core::{ListedEntry, UrlMode};

use crate::error::StoreResult;
use crate::store::MediaStore;

/// Serves object URLs from a public bucket domain instead of presigning.
///
/// Listing and search go to the wrapped store; URLs are plain
/// `{base}/{encoded key}` for every mode.
///
/// # Examples
///
/// ```
/// use mediavault_core::UrlMode;
/// use mediavault_store::{MediaStore, MemoryStore, PublicUrlStore};
///
/// # tokio_test::block_on(async {
/// let store = PublicUrlStore::new(MemoryStore::new("memory://sermons"), "https://pub.example.dev/");
/// let url = store.url_for("youth/a b.mp4", &UrlMode::Stream).await.unwrap();
/// assert_eq!(url, "https://pub.example.dev/youth/a%20b.mp4");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct PublicUrlStore<S> {
    inner: S,
    base_url: String,
}

impl<S: MediaStore> PublicUrlStore<S> {
    /// Wrap `inner`, serving URLs under `base_url`.
    #[must_use]
    pub fn new(inner: S, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { inner, base_url }
    }

    /// The wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: MediaStore> MediaStore for PublicUrlStore<S> {
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ListedEntry>> {
        self.inner.list(prefix).await
    }

    async fn search(&self, pattern: &str) -> StoreResult<Vec<ListedEntry>> {
        self.inner.search(pattern).await
    }

    async fn url_for(&self, key: &str, _mode: &UrlMode) -> StoreResult<String> {
        Ok(format!(
            "{}/{}",
            self.base_url,
            encode_key(key.trim_start_matches('/'))
        ))
    }
}
