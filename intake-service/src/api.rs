//! HTTP API for the intake service.
//!
//! This module provides the REST API endpoints for:
//! - Health monitoring
//! - Document upload and retrieval
//! - Signed blob access
//! - Form descriptors

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::StaticConfig;
use crate::service::DocumentService;
use crate::storage::UrlSigner;

pub mod blobs;
pub mod documents;
pub mod forms;
use blobs::get_blob_handler;
use documents::{get_document_handler, upload_document_handler};
use forms::list_forms_handler;

/// Room for the JSON envelope around a base64 encoded upload
const UPLOAD_ENVELOPE_BYTES: usize = 64 * 1024;

/// Application state
pub struct AppState {
    pub service: Arc<DocumentService>,
    pub signer: Arc<UrlSigner>,
    /// Bucket that receives uploads
    pub bucket: String,
    /// Folder within the bucket that receives uploads
    pub upload_folder: String,
    pub max_document_size_bytes: u64,
    pub start_time: Instant,
}

/// Upper bound for an upload request body carrying `max_document_size` bytes.
pub(crate) fn upload_body_limit(max_document_size: u64) -> usize {
    let encoded = max_document_size.div_ceil(3).saturating_mul(4);
    usize::try_from(encoded)
        .unwrap_or(usize::MAX)
        .saturating_add(UPLOAD_ENVELOPE_BYTES)
}

/// Build the API router
pub fn router(
    service: Arc<DocumentService>,
    signer: Arc<UrlSigner>,
    config: &StaticConfig,
) -> Router {
    let state = Arc::new(AppState {
        service,
        signer,
        bucket: config.storage.bucket.clone(),
        upload_folder: config.storage.upload_folder.clone(),
        max_document_size_bytes: config.limits.max_document_size_bytes,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_body_size = upload_body_limit(config.limits.max_document_size_bytes);

    let api_routes = Router::new()
        // Document endpoints - with larger body limit for file uploads
        .route(
            "/documents",
            post(upload_document_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/documents/{document_id}", get(get_document_handler))
        // Targets of signed access URLs
        .route("/blobs/{bucket}/{*key}", get(get_blob_handler))
        .route("/forms", get(list_forms_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}
