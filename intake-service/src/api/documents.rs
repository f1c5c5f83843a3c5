//! Document API endpoints.
//!
//! Upload takes a base64 encoded file in a JSON body; retrieval returns the
//! record together with a signed URL and the base64 encoded file.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::db::{DocumentStatus, ExtractedData};
use crate::error::{ServiceError, format_error_chain};
use crate::service::{CreatedDocument, RetrievedDocument};

use super::AppState;

/// Request to upload a document
#[derive(Deserialize)]
pub struct UploadRequest {
    pub file_name: Option<String>,
    /// File bytes, base64 encoded
    pub file_content: Option<String>,
}

/// Response for a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(rename = "documentId")]
    pub document_id: String,
}

/// A document as returned to clients
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub status: DocumentStatus,
    pub document_id: String,
    /// Locator of the stored file
    pub document_key: String,
    pub document_type: Option<String>,
    pub extracted_data: Option<ExtractedData>,
    pub signed_url: String,
    pub base64_encoded_file: String,
}

impl From<CreatedDocument> for UploadResponse {
    fn from(created: CreatedDocument) -> Self {
        Self {
            message: "File uploaded successfully.".to_string(),
            document_id: created.document_id,
        }
    }
}

impl From<RetrievedDocument> for DocumentResponse {
    fn from(document: RetrievedDocument) -> Self {
        let RetrievedDocument {
            record,
            access_url,
            content,
        } = document;

        Self {
            status: record.status,
            document_id: record.document_id,
            document_key: record.document_url,
            document_type: record.document_type,
            extracted_data: record.extracted_data,
            signed_url: access_url,
            base64_encoded_file: BASE64.encode(content),
        }
    }
}

fn missing_field(field: &str) -> ServiceError {
    ServiceError::InvalidRequest {
        message: format!("Missing required field: {field}"),
    }
}

/// Upload a new document
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ServiceError> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServiceError::UploadTooLarge {
                max: state.max_document_size_bytes,
            }
        } else {
            ServiceError::InvalidRequest {
                message: rejection.body_text(),
            }
        }
    })?;

    let file_name = request.file_name.ok_or_else(|| missing_field("file_name"))?;
    let encoded = request
        .file_content
        .ok_or_else(|| missing_field("file_content"))?;
    let content = BASE64
        .decode(encoded.trim())
        .map_err(|e| ServiceError::InvalidRequest {
            message: format!("file_content is not valid base64: {e}"),
        })?;

    let created = state
        .service
        .create_document(&file_name, &content, &state.bucket, &state.upload_folder)
        .inspect_err(|e| {
            if e.status_code().is_server_error() {
                error!(
                    file_name = %file_name,
                    error = %format_error_chain(e),
                    "An internal error happened while trying to upload a document"
                );
            }
        })?;

    info!(
        document_id = %created.document_id,
        document_url = %created.document_url,
        blob_key = %created.blob_key,
        size = content.len(),
        "Document uploaded"
    );

    Ok(Json(created.into()))
}

/// Get a document with its extraction results and file
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<DocumentResponse>, ServiceError> {
    let document = state
        .service
        .get_document(&document_id)
        .map_err(|e| {
            error!(
                document_id = %document_id,
                error = %format_error_chain(&e),
                "An internal error happened while trying to get a document"
            );
            ServiceError::Internal {
                message: format!("Failed to get document {document_id}"),
            }
        })?
        .ok_or_else(|| ServiceError::DocumentNotFound {
            document_id: document_id.clone(),
        })?;

    Ok(Json(document.into()))
}
