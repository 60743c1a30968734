//! Error types for storage backends.

use http::StatusCode;
use mediavault_auth::SignError;
use mediavault_xml::XmlError;

/// Errors returned by [`MediaStore`](crate::MediaStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage service answered with a non-success status.
    #[error("storage service returned {status}: {body}")]
    Upstream {
        /// Response status.
        status: StatusCode,
        /// Response body, verbatim.
        body: String,
    },

    /// The request never produced a response.
    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The listing body could not be parsed.
    #[error(transparent)]
    Listing(#[from] XmlError),

    /// A request or URL could not be signed.
    #[error(transparent)]
    Signing(#[from] SignError),

    /// A page claimed more results but carried no continuation token.
    #[error("truncated listing page carried no continuation token")]
    MissingCursor,
}

/// Convenience result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
