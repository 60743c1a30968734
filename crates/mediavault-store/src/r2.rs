//! Cloudflare R2 backend.
//!
//! Listings are path-style `ListObjectsV2` requests signed with SigV4 headers;
//! object URLs are SigV4 presigned URLs. Pages are fetched one after another,
//! each page's continuation token feeding the next request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, Method};
use mediavault_auth::canonical::encode_query_pairs;
use mediavault_auth::{Credentials, MAX_PRESIGN_EXPIRES, PresignedUrl, SignError, Signer, encode_key};
use mediavault_core::{ArchiveConfig, ListedEntry, ListingPage, StorageConfig, UrlMode};
use mediavault_xml::{parse_listing, search_by_name_pattern};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::{MediaStore, attachment_disposition};

/// Folder separator used as the listing delimiter.
const DELIMITER: &str = "/";

/// Signer-backed R2 store.
#[derive(Debug, Clone)]
pub struct R2Store {
    client: reqwest::Client,
    signer: Arc<Signer>,
    bucket_url: String,
    presign_expires: u64,
}

impl R2Store {
    /// Build a store from the storage section of the configuration.
    ///
    /// # Errors
    ///
    /// Fails when a credential is empty, when `presign_expires` is outside
    /// `1..=604800`, or when the HTTP client cannot be built.
    pub fn new(storage: &StorageConfig, presign_expires: u64, timeout: Duration) -> StoreResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, storage, presign_expires)
    }

    /// Build a store from the full server configuration.
    pub fn from_config(config: &ArchiveConfig) -> StoreResult<Self> {
        Self::new(
            &config.storage,
            config.presign_expires,
            Duration::from_secs(config.storage_timeout_secs),
        )
    }

    /// Build a store around an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        storage: &StorageConfig,
        presign_expires: u64,
    ) -> StoreResult<Self> {
        if presign_expires == 0 || presign_expires > MAX_PRESIGN_EXPIRES {
            return Err(SignError::InvalidExpiry(presign_expires).into());
        }
        let credentials = Credentials::new(
            storage.access_key_id.as_str(),
            storage.secret_access_key.as_str(),
        )?;

        Ok(Self {
            client,
            signer: Arc::new(Signer::new(credentials, storage.region.as_str())),
            bucket_url: storage.bucket_url(),
            presign_expires,
        })
    }

    /// The listing URL for one page. Query pairs are encoded and sorted, so
    /// the raw query is already canonical.
    #[must_use]
    pub fn list_url(&self, prefix: &str, delimiter: Option<&str>, cursor: Option<&str>) -> String {
        let mut pairs = vec![("list-type", "2")];
        if let Some(delimiter) = delimiter {
            pairs.push(("delimiter", delimiter));
        }
        if !prefix.is_empty() {
            pairs.push(("prefix", prefix));
        }
        if let Some(cursor) = cursor {
            pairs.push(("continuation-token", cursor));
        }
        format!("{}?{}", self.bucket_url, encode_query_pairs(&pairs))
    }

    /// Fetch and parse a single listing page.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Upstream`] for a non-success status; no retry is
    /// attempted.
    pub async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        cursor: Option<&str>,
    ) -> StoreResult<ListingPage> {
        let url = self.list_url(prefix, delimiter, cursor);
        let headers = self
            .signer
            .sign_headers(&Method::GET, &url, &HeaderMap::new(), b"")?;

        let response = self.client.get(&url).headers(headers).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(%status, prefix, "listing request rejected");
            return Err(StoreError::Upstream { status, body });
        }

        let page = parse_listing(&body)?;
        debug!(
            prefix,
            entries = page.entries.len(),
            truncated = page.is_truncated,
            "fetched listing page"
        );
        Ok(page)
    }

    /// Fetch every page under `prefix`.
    async fn list_all(&self, prefix: &str, delimiter: Option<&str>) -> StoreResult<Vec<ListedEntry>> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list_page(prefix, delimiter, cursor.as_deref()).await?;
            entries.extend(page.entries);
            if !page.is_truncated {
                break;
            }
            cursor = Some(page.next_cursor.ok_or(StoreError::MissingCursor)?);
        }
        Ok(entries)
    }

    /// Presign an object URL.
    ///
    /// `extra_query` holds raw pairs signed into the URL, e.g.
    /// `response-content-disposition`.
    pub fn presign(
        &self,
        method: &Method,
        key: &str,
        extra_query: &[(&str, &str)],
        expires: u64,
    ) -> StoreResult<PresignedUrl> {
        let url = self.object_url(key);
        Ok(self.signer.presign_url(method, &url, extra_query, expires)?)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.bucket_url, encode_key(key.trim_start_matches('/')))
    }
}

#[async_trait]
impl MediaStore for R2Store {
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ListedEntry>> {
        self.list_all(prefix, Some(DELIMITER)).await
    }

    async fn search(&self, pattern: &str) -> StoreResult<Vec<ListedEntry>> {
        let files: Vec<ListedEntry> = self
            .list_all("", None)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_directory)
            .collect();
        Ok(search_by_name_pattern(&files, pattern))
    }

    async fn url_for(&self, key: &str, mode: &UrlMode) -> StoreResult<String> {
        let presigned = match mode {
            UrlMode::Stream => self.presign(&Method::GET, key, &[], self.presign_expires)?,
            UrlMode::Download { filename } => {
                let disposition = attachment_disposition(filename);
                self.presign(
                    &Method::GET,
                    key,
                    &[("response-content-disposition", disposition.as_str())],
                    self.presign_expires,
                )?
            }
        };
        Ok(presigned.url)
    }
}
