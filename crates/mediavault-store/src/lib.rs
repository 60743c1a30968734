//! Storage backends for the MediaVault catalog.
//!
//! Every backend implements [`MediaStore`]:
//!
//! - [`R2Store`] signs listing requests and presigns object URLs.
//! - [`PublicUrlStore`] wraps another store and serves unsigned public URLs.
//! - [`MemoryStore`] keeps the catalog in process.

mod error;
mod memory;
mod public;
mod r2;
mod store;

use std::sync::Arc;

use mediavault_core::ArchiveConfig;
use tracing::info;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use public::PublicUrlStore;
pub use r2::R2Store;
pub use store::{MediaStore, attachment_disposition};

/// Build the store described by `config`.
///
/// R2 is always the listing backend; when a public base URL is configured,
/// object URLs are served from it instead of being presigned.
pub fn store_from_config(config: &ArchiveConfig) -> StoreResult<Arc<dyn MediaStore>> {
    let r2 = R2Store::from_config(config)?;
    let store: Arc<dyn MediaStore> = match &config.public_base_url {
        Some(base_url) => {
            info!(%base_url, "serving object URLs from public bucket");
            Arc::new(PublicUrlStore::new(r2, base_url.as_str()))
        }
        None => {
            info!(expires = config.presign_expires, "serving presigned object URLs");
            Arc::new(r2)
        }
    };
    Ok(store)
}
