//! Integration tests for MediaVault.
//!
//! Storage tests talk to a real R2 (or other S3-compatible) bucket configured
//! through the usual `R2_*` variables. Server tests additionally require a
//! running `mediavault-server` at `MEDIAVAULT_URL` (default
//! `http://localhost:8787`). Everything is marked `#[ignore]` so it doesn't run
//! during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p mediavault-integration -- --ignored
//! ```
//!
//! `MEDIAVAULT_TEST_KEY` names an existing object used by the URL tests.

use std::sync::Once;

use anyhow::Context;
use mediavault_core::ArchiveConfig;
use mediavault_store::R2Store;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Load the archive configuration from the environment.
pub fn archive_config() -> anyhow::Result<ArchiveConfig> {
    init_tracing();
    ArchiveConfig::from_env().context("R2_* variables must be set for integration tests")
}

/// Create an R2 store from the environment.
pub fn r2_store() -> anyhow::Result<R2Store> {
    let config = archive_config()?;
    R2Store::from_config(&config).context("failed to build R2 store")
}

/// Object key known to exist in the test bucket.
pub fn test_object_key() -> anyhow::Result<String> {
    std::env::var("MEDIAVAULT_TEST_KEY").context("MEDIAVAULT_TEST_KEY must name an existing object")
}

/// Base URL of a running server.
#[must_use]
pub fn server_url() -> String {
    std::env::var("MEDIAVAULT_URL").unwrap_or_else(|_| "http://localhost:8787".to_owned())
}

/// HTTP client that does not follow redirects, so `302` responses can be inspected.
pub fn no_redirect_client() -> anyhow::Result<reqwest::Client> {
    init_tracing();
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("failed to build HTTP client")
}

mod test_listing;
mod test_presign;
mod test_server;
