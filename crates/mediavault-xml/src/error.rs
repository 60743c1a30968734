//! Error types for listing parsing.

/// Errors raised while parsing a ListObjectsV2 response body.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// The body is an S3 `<Error>` document.
    #[error("storage service error {code}: {message}")]
    Service {
        /// Service error code, e.g. `NoSuchBucket`.
        code: String,
        /// Human-readable message, empty when the service sent none.
        message: String,
    },

    /// The body is not a `ListBucketResult` document.
    #[error("unexpected document: missing ListBucketResult element")]
    UnexpectedDocument,

    /// The body is not well-formed XML.
    #[error("malformed listing markup: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// The body looked like a listing but could not be deserialized.
    #[error("failed to parse listing: {0}")]
    Deserialize(#[from] quick_xml::DeError),
}
