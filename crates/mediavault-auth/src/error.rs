//! Error types for request signing.

/// Errors that can occur while signing a request or presigning a URL.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The URL to sign could not be parsed or lacks a scheme or host.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A header value is not visible ASCII and cannot be canonicalized.
    #[error("invalid value for header: {0}")]
    InvalidHeaderValue(String),

    /// The requested presign validity lies outside `1..=604800` seconds.
    #[error("presign expiry out of range: {0}s (allowed 1..=604800)")]
    InvalidExpiry(u64),

    /// A credential component is empty.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// A presigned URL lacks a parameter needed to compute its expiry.
    #[error("presigned URL is missing {0}")]
    MissingQueryParam(&'static str),
}
