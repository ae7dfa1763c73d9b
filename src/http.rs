//! Router and request handlers for the loopback UI server.

use crate::resolve;
use crate::server::ServerConfig;
use axum::extract::{Path as UrlPath, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Build the router. Every response passes the permissive CORS layer; the
/// frontend may be loaded from a `file://` or host-webview origin, so the
/// origin cannot be pinned.
pub fn build_router(config: Arc<ServerConfig>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_static))
        .with_state(config)
        .layer(cors)
}

/// Liveness probe for the host-side shim.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Serve the root index.html.
async fn serve_index(State(config): State<Arc<ServerConfig>>) -> Response {
    serve_path(&config, "").await
}

/// Serve a file from the content root with its extension's MIME type.
async fn serve_static(
    State(config): State<Arc<ServerConfig>>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    serve_path(&config, &path).await
}

async fn serve_path(config: &ServerConfig, raw_path: &str) -> Response {
    match resolve::resolve(&config.root_dir, raw_path).await {
        Ok(file) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, file.mime)],
            file.bytes,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
