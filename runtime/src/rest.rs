// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for Feedvault.
//!
//! Triggers harvest runs, reports their status, lists the stored media
//! set and proxies individual media files from the CDN.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use feedvault::Post;

use crate::job::HarvestJob;
use crate::posts;
use crate::proxy::MediaFetcher;

/// One year, for immutable CDN assets.
pub const MEDIA_CACHE_CONTROL: &str = "public, max-age=31536000";

/// State shared by all handlers.
pub struct AppState {
    pub job: Arc<HarvestJob>,
    pub fetcher: MediaFetcher,
    /// Post list used when a trigger carries no body.
    pub posts_path: PathBuf,
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/harvest", post(handle_harvest))
        .route("/api/v1/harvest/status", get(handle_status))
        .route("/api/v1/media", get(handle_list_media))
        .route("/api/v1/media/:id", get(handle_media))
        .layer(cors)
        .with_state(state)
}

/// Start the REST API server on the given port.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message.into() } })),
    )
        .into_response()
}

// ── Handlers ────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Body, when present, is the post list; otherwise the configured file.
async fn handle_harvest(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let loaded: anyhow::Result<Vec<Post>> = if body.iter().all(u8::is_ascii_whitespace) {
        posts::load(&state.posts_path)
    } else {
        std::str::from_utf8(&body)
            .map_err(anyhow::Error::from)
            .and_then(posts::parse)
    };
    let list = match loaded.and_then(|p| posts::validate(&p).map(|_| p).map_err(anyhow::Error::from)) {
        Ok(list) => list,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "E_INVALID_POSTS", format!("{e:#}")),
    };

    let count = list.len();
    match state.job.trigger(list).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "message": "Harvest started",
                "posts": count,
            })),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, "E_BUSY", e.to_string()),
    }
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.job.status().await;
    Json(serde_json::to_value(status).unwrap_or_else(|_| json!({})))
}

async fn handle_list_media(State(state): State<Arc<AppState>>) -> Response {
    match state.job.store().list() {
        Ok(items) if items.is_empty() => {
            error_response(StatusCode::NOT_FOUND, "E_EMPTY", "No media stored yet")
        }
        Ok(items) => Json(json!({ "media": items })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "E_STORAGE", e.to_string()),
    }
}

/// Stream one stored asset from the CDN.
async fn handle_media(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    let item = match state.job.store().get(id) {
        Ok(Some(item)) => item,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "E_NOT_FOUND", "Content not found"),
        Err(e) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "E_STORAGE", e.to_string())
        }
    };

    let upstream = match state.fetcher.fetch(&item.media.link).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!("Media fetch failed for {id}: {e}");
            return error_response(
                StatusCode::BAD_GATEWAY,
                "E_UPSTREAM",
                "Failed to fetch media from source",
            );
        }
    };

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let mut response = Body::from_stream(upstream.bytes_stream()).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(MEDIA_CACHE_CONTROL),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("cross-origin"),
    );
    response
}
