//! Bucket listing parser for MediaVault.
//!
//! [`parse_listing`] turns one ListObjectsV2 response body into a
//! [`ListingPage`](mediavault_core::ListingPage); [`search_by_name_pattern`]
//! filters the resulting entries by name.

mod error;
mod listing;
mod search;

pub use error::XmlError;
pub use listing::parse_listing;
pub use search::search_by_name_pattern;
