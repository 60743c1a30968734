//! Core types and configuration for MediaVault.
//!
//! This crate provides the building blocks shared by the signer, the listing
//! parser, the storage backends, and the HTTP server: environment-driven
//! configuration and the catalog entry types produced by a bucket listing.

mod config;
mod error;
mod types;

pub use config::{ArchiveConfig, StorageConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::{ListedEntry, ListingPage, UrlMode};
