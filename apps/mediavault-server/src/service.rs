//! Catalog HTTP service.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /api/videos/folders?path=P` | one folder level under `P` (or a search with `q=`) |
//! | `GET /api/videos/search?q=Q` | every file whose name or path contains `Q` |
//! | `GET /api/videos/stream?path=K` | `302` to a playable URL for `K` |
//! | `GET /api/videos/download?path=K` | `302` to a download URL for `K` |
//! | `GET /health` | `{"status":"running"}` |
//! | `OPTIONS *` | `204` CORS preflight |

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, LOCATION,
};
use http::{Method, Response, StatusCode, Uri};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::Service;
use mediavault_core::{ListedEntry, UrlMode};
use mediavault_store::{MediaStore, StoreError};
use serde_json::{Value, json};
use tracing::{debug, error, warn};

/// Response body type for every route.
pub type CatalogBody = Full<Bytes>;

/// Routes catalog API requests to a [`MediaStore`].
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: Arc<dyn MediaStore>,
}

impl CatalogService {
    /// Serve the catalog held by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self { store }
    }

    /// Answer one request. Never fails: errors become JSON error responses.
    pub async fn handle(&self, method: &Method, uri: &Uri) -> Response<CatalogBody> {
        let path = uri.path();
        let params = query_params(uri);
        debug!(%method, path, "handling request");

        if *method == Method::OPTIONS {
            return preflight_response();
        }
        if *method != Method::GET {
            return json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &json!({ "error": "Method not allowed" }),
            );
        }

        match path {
            "/health" => health_check_response(),
            "/api/videos/folders" => self.folders(&params).await,
            "/api/videos/search" => match non_empty(&params, "q") {
                Some(q) => self.search(q).await,
                None => json_response(
                    StatusCode::BAD_REQUEST,
                    &json!({ "error": "Query required" }),
                ),
            },
            "/api/videos/stream" => match non_empty(&params, "path") {
                Some(key) => self.redirect(key, &UrlMode::Stream).await,
                None => path_required(),
            },
            "/api/videos/download" => match non_empty(&params, "path") {
                Some(key) => {
                    let mode = UrlMode::Download {
                        filename: leaf_name(key).to_owned(),
                    };
                    self.redirect(key, &mode).await
                }
                None => path_required(),
            },
            _ => json_response(StatusCode::NOT_FOUND, &json!({ "error": "Not found" })),
        }
    }

    async fn folders(&self, params: &HashMap<String, String>) -> Response<CatalogBody> {
        if let Some(q) = non_empty(params, "q") {
            return self.search(q).await;
        }
        let prefix = folder_prefix(params.get("path").map_or("", String::as_str));
        match self.store.list(&prefix).await {
            Ok(entries) => files_response(&entries),
            Err(e) => store_error_response(&e),
        }
    }

    async fn search(&self, pattern: &str) -> Response<CatalogBody> {
        match self.store.search(pattern).await {
            Ok(entries) => files_response(&entries),
            Err(e) => store_error_response(&e),
        }
    }

    async fn redirect(&self, key: &str, mode: &UrlMode) -> Response<CatalogBody> {
        let url = match self.store.url_for(key, mode).await {
            Ok(url) => url,
            Err(e) => return store_error_response(&e),
        };
        match Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, url)
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(CatalogBody::default())
        {
            Ok(response) => response,
            Err(e) => {
                error!(key, error = %e, "object URL is not a valid Location header");
                json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &json!({ "error": "Invalid object URL" }),
                )
            }
        }
    }
}

impl Service<http::Request<Incoming>> for CatalogService {
    type Response = Response<CatalogBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req.method(), req.uri()).await) })
    }
}

fn query_params(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn non_empty<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// `"youth/2023"` -> `"youth/2023/"`; empty stays empty (bucket root).
fn folder_prefix(path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        String::new()
    } else {
        format!("{path}/")
    }
}

fn leaf_name(key: &str) -> &str {
    key.rsplit('/').find(|s| !s.is_empty()).unwrap_or(key)
}

fn files_response(entries: &[ListedEntry]) -> Response<CatalogBody> {
    json_response(
        StatusCode::OK,
        &json!({ "success": true, "data": { "files": entries } }),
    )
}

fn path_required() -> Response<CatalogBody> {
    json_response(StatusCode::BAD_REQUEST, &json!({ "error": "Path required" }))
}

fn store_error_response(e: &StoreError) -> Response<CatalogBody> {
    warn!(error = %e, "storage request failed");
    json_response(StatusCode::BAD_GATEWAY, &json!({ "error": e.to_string() }))
}

fn json_response(status: StatusCode, body: &Value) -> Response<CatalogBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static JSON response should be valid")
}

fn preflight_response() -> Response<CatalogBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS")
        .header(ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
        .body(CatalogBody::default())
        .expect("static preflight response should be valid")
}

fn health_check_response() -> Response<CatalogBody> {
    json_response(StatusCode::OK, &json!({ "status": "running" }))
}
