//! MediaVault Server - video archive catalog over S3-compatible storage.
//!
//! Serves folder browsing and search over a bucket listing, and redirects
//! playback and download requests to signed (or public) object URLs.
//!
//! # Usage
//!
//! ```text
//! R2_ACCOUNT_ID=... R2_ACCESS_KEY_ID=... R2_SECRET_ACCESS_KEY=... \
//! R2_BUCKET_NAME=sermons mediavault-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `R2_ACCOUNT_ID` | *(required)* | Cloudflare account id |
//! | `R2_ACCESS_KEY_ID` | *(required)* | Access key id |
//! | `R2_SECRET_ACCESS_KEY` | *(required)* | Secret access key |
//! | `R2_BUCKET_NAME` | *(required)* | Bucket holding the archive |
//! | `R2_ENDPOINT` | `https://{account}.r2.cloudflarestorage.com` | Endpoint override |
//! | `R2_REGION` | `auto` | Signing region |
//! | `PRESIGN_EXPIRES` | `3600` | Presigned URL validity (seconds) |
//! | `PUBLIC_BASE_URL` | *(unset)* | Serve unsigned URLs from a public bucket |
//! | `STORAGE_TIMEOUT_SECS` | `30` | Outbound request timeout |
//! | `GATEWAY_LISTEN` | `0.0.0.0:8787` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod service;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use mediavault_core::ArchiveConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::service::CatalogService;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address, used by `--health-check` when configuration is incomplete.
const DEFAULT_LISTEN: &str = "0.0.0.0:8787";

/// Install the global subscriber. `RUST_LOG`, when set, wins over `LOG_LEVEL`.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c, shutting down");
    }
}

/// Accept connections until ctrl-c, then wait for open ones to finish.
async fn serve(listener: TcpListener, service: CatalogService) -> Result<()> {
    let builder = HttpConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            () = &mut shutdown => break,
        };

        let conn = builder
            .serve_connection(TokioIo::new(stream), service.clone())
            .into_owned();
        let conn = graceful.watch(conn);
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!(%peer, error = %e, "connection failed");
            }
        });
    }

    info!("shutdown requested, draining open connections");
    graceful.shutdown().await;
    info!("stopped");

    Ok(())
}

/// `GET /health` over a raw socket; succeeds only on a running status.
async fn run_health_check(addr: &str) -> Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;
    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = String::new();
    stream.read_to_string(&mut response).await?;

    let status_ok = response
        .lines()
        .next()
        .is_some_and(|line| line.split_whitespace().nth(1) == Some("200"));
    anyhow::ensure!(
        status_ok && response.contains(r#""status":"running""#),
        "unhealthy response from {addr}"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|a| a == "--health-check") {
        let listen = std::env::var("GATEWAY_LISTEN").unwrap_or_else(|_| DEFAULT_LISTEN.to_owned());
        let addr = listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = ArchiveConfig::from_env().context("failed to load configuration")?;

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        bucket = %config.storage.bucket,
        endpoint = %config.storage.endpoint_url(),
        region = %config.storage.region,
        public_urls = config.public_base_url.is_some(),
        version = VERSION,
        "starting MediaVault Server",
    );

    let store = mediavault_store::store_from_config(&config)
        .context("failed to initialize storage backend")?;
    let service = CatalogService::new(store);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mediavault_store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_should_pass_health_check_against_running_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let service = CatalogService::new(Arc::new(MemoryStore::new("memory://sermons")));
        tokio::spawn(serve(listener, service));

        run_health_check(&addr).await.unwrap();
    }

    #[tokio::test]
    async fn test_should_fail_health_check_without_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(run_health_check(&addr).await.is_err());
    }
}
