//! AWS Signature Version 4 signing for S3-compatible object storage.
//!
//! Two entry points are provided on [`Signer`]:
//!
//! - [`Signer::sign_headers`] for requests the server itself sends (bucket listings).
//! - [`Signer::presign_url`] for time-limited URLs handed to browsers.
//!
//! Both are deterministic for a fixed timestamp; the `_at` variants expose that.

pub mod canonical;
mod credentials;
mod error;
mod presigned;
pub mod sigv4;

pub use canonical::encode_key;
pub use credentials::Credentials;
pub use error::SignError;
pub use presigned::{MAX_PRESIGN_EXPIRES, PresignedUrl, UNSIGNED_PAYLOAD, presigned_expiry};
pub use sigv4::Signer;
