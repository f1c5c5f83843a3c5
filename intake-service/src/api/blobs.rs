//! Signed blob access endpoint.
//!
//! Serves the bytes behind a signed URL issued by a blob store backend.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{ServiceError, StorageError, format_error_chain};
use crate::storage::BlobLocator;

use super::AppState;

/// Signature carried by a signed URL
#[derive(Deserialize)]
pub struct BlobAccessParams {
    pub expires: i64,
    pub signature: String,
}

/// Guess a content type from the key's extension
fn content_type_for(key: &str) -> mime::Mime {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => mime::APPLICATION_PDF,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "txt" => mime::TEXT_PLAIN_UTF_8,
        "json" => mime::APPLICATION_JSON,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Serve a stored file to the holder of a valid signed URL
pub async fn get_blob_handler(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<BlobAccessParams>,
) -> Result<impl IntoResponse, ServiceError> {
    // A key that cannot be stored cannot have been signed
    let locator = BlobLocator::new(&bucket, &key).map_err(|_| StorageError::NotFound {
        locator: format!("{bucket}/{key}"),
    })?;

    state
        .signer
        .verify(
            &locator,
            params.expires,
            &params.signature,
            chrono::Utc::now().timestamp(),
        )
        .inspect_err(|e| debug!(locator = %locator, error = %e, "Rejected blob access"))?;

    let content = state
        .service
        .blobs()
        .get_blob(&locator.to_string())
        .inspect_err(|e| {
            if e.status_code().is_server_error() {
                error!(
                    locator = %locator,
                    error = %format_error_chain(e),
                    "An internal error happened while trying to read a blob"
                );
            }
        })?;

    Ok((
        [(header::CONTENT_TYPE, content_type_for(&locator.key).to_string())],
        content,
    ))
}
