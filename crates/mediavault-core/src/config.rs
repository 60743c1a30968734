//! Configuration management for MediaVault.
//!
//! All configuration is driven by environment variables. Storage credentials
//! are mandatory and their absence is a fatal startup error; everything else
//! falls back to a default.

use std::fmt;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{ConfigError, ConfigResult};

/// Default validity of presigned URLs, in seconds.
const DEFAULT_PRESIGN_EXPIRES: u64 = 3600;

/// Default timeout applied to outbound storage requests, in seconds.
const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 30;

/// Object storage credentials and addressing.
///
/// Loaded once at startup and shared read-only by every signing operation.
/// The secret access key never appears in `Debug` output or serialized form.
///
/// # Examples
///
/// ```
/// use mediavault_core::StorageConfig;
///
/// let storage = StorageConfig::builder()
///     .account_id("abc123".into())
///     .access_key_id("AKID".into())
///     .secret_access_key("secret".into())
///     .bucket("sermons".into())
///     .build();
///
/// assert_eq!(storage.endpoint_url(), "https://abc123.r2.cloudflarestorage.com");
/// assert_eq!(storage.endpoint_host(), "abc123.r2.cloudflarestorage.com");
/// assert_eq!(storage.region, "auto");
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Cloudflare account identifier.
    pub account_id: String,

    /// Access key id used in the credential scope.
    pub access_key_id: String,

    /// Secret access key seeding the signing-key chain.
    #[serde(skip_serializing)]
    pub secret_access_key: String,

    /// Bucket holding the media catalog.
    pub bucket: String,

    /// Endpoint override (scheme and authority). Derived from the account id when absent.
    #[builder(default)]
    pub endpoint: Option<String>,

    /// Signing region. R2 accepts `auto`.
    #[builder(default = String::from("auto"))]
    pub region: String,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish()
    }
}

impl StorageConfig {
    /// The endpoint base URL, without a trailing slash.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_owned(),
            None => format!("https://{}.r2.cloudflarestorage.com", self.account_id),
        }
    }

    /// The endpoint authority (`host` or `host:port`), as sent in the `host` header.
    #[must_use]
    pub fn endpoint_host(&self) -> String {
        let url = self.endpoint_url();
        let without_scheme = url.split_once("://").map_or(url.as_str(), |(_, rest)| rest);
        without_scheme
            .split('/')
            .next()
            .unwrap_or(without_scheme)
            .to_owned()
    }

    /// The path-style URL of the bucket root.
    #[must_use]
    pub fn bucket_url(&self) -> String {
        format!("{}/{}", self.endpoint_url(), self.bucket)
    }
}

/// Top-level configuration for the MediaVault server.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveConfig {
    /// Bind address for the HTTP server.
    #[builder(default = String::from("0.0.0.0:8787"))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Validity of presigned URLs, in seconds.
    #[builder(default = DEFAULT_PRESIGN_EXPIRES)]
    pub presign_expires: u64,

    /// Public bucket base URL. When set, object URLs are served from it unsigned.
    #[builder(default)]
    pub public_base_url: Option<String>,

    /// Timeout for outbound storage requests, in seconds.
    #[builder(default = DEFAULT_STORAGE_TIMEOUT_SECS)]
    pub storage_timeout_secs: u64,

    /// Object storage credentials.
    pub storage: StorageConfig,
}

impl ArchiveConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `R2_ACCOUNT_ID` | *(required)* |
    /// | `R2_ACCESS_KEY_ID` | *(required)* |
    /// | `R2_SECRET_ACCESS_KEY` | *(required)* |
    /// | `R2_BUCKET_NAME` | *(required)* |
    /// | `R2_ENDPOINT` | `https://{account}.r2.cloudflarestorage.com` |
    /// | `R2_REGION` | `auto` |
    /// | `PRESIGN_EXPIRES` | `3600` |
    /// | `PUBLIC_BASE_URL` | *(unset)* |
    /// | `STORAGE_TIMEOUT_SECS` | `30` |
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8787` |
    /// | `LOG_LEVEL` | `info` |
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::MissingVar(name));

        let storage = StorageConfig {
            account_id: require("R2_ACCOUNT_ID")?,
            access_key_id: require("R2_ACCESS_KEY_ID")?,
            secret_access_key: require("R2_SECRET_ACCESS_KEY")?,
            bucket: require("R2_BUCKET_NAME")?,
            endpoint: get("R2_ENDPOINT"),
            region: get("R2_REGION").unwrap_or_else(|| String::from("auto")),
        };

        let mut config = Self::builder().storage(storage).build();

        if let Some(v) = get("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = get("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = get("PRESIGN_EXPIRES") {
            config.presign_expires = parse_u64("PRESIGN_EXPIRES", &v)?;
        }
        if let Some(v) = get("PUBLIC_BASE_URL") {
            config.public_base_url = Some(v.trim_end_matches('/').to_owned());
        }
        if let Some(v) = get("STORAGE_TIMEOUT_SECS") {
            config.storage_timeout_secs = parse_u64("STORAGE_TIMEOUT_SECS", &v)?;
        }

        tracing::debug!(
            bucket = %config.storage.bucket,
            endpoint = %config.storage.endpoint_url(),
            "loaded archive configuration"
        );

        Ok(config)
    }
}

fn parse_u64(name: &'static str, value: &str) -> ConfigResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue {
            name,
            value: value.to_owned(),
        })
}
