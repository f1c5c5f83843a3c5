use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: String },

    #[error("No document stored at {document_url}")]
    DocumentUrlNotFound { document_url: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("File too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Upload too large (max {max} bytes of file content)")]
    UploadTooLarge { max: u64 },

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Blob storage error")]
    Storage(#[from] StorageError),

    #[error("Dependency registry error")]
    Registry(#[from] RegistryError),

    #[error("Queue error")]
    Queue(#[from] QueueError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed")]
    Serialization(#[source] serde_json::Error),
}

/// Blob storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Blob not found: {locator}")]
    NotFound { locator: String },

    #[error("Invalid blob locator: {locator}")]
    InvalidLocator { locator: String },

    #[error("Blob I/O failed for {locator}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Access URL signature does not match")]
    InvalidSignature,

    #[error("Signing key rejected")]
    InvalidSigningKey,

    #[error("Access URL expired at {expires}")]
    Expired { expires: i64 },
}

/// Dependency registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No implementation registered for {capability}")]
    UnboundCapability { capability: &'static str },
}

/// Extraction result queue errors
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue I/O failed at {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed queue message")]
    MalformedMessage(#[source] serde_json::Error),
}

/// API error response (matches Axum's built-in JsonRejection format)
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DocumentNotFound { .. }
            | ServiceError::DocumentUrlNotFound { .. }
            | ServiceError::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::FileTooLarge { .. } | ServiceError::UploadTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ServiceError::Storage(StorageError::InvalidSignature)
            | ServiceError::Storage(StorageError::Expired { .. }) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::DocumentNotFound { .. } => "document_not_found",
            ServiceError::DocumentUrlNotFound { .. } => "document_url_not_found",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::FileTooLarge { .. } | ServiceError::UploadTooLarge { .. } => {
                "file_too_large"
            }
            ServiceError::Database(_) => "database_error",
            ServiceError::Storage(StorageError::NotFound { .. }) => "blob_not_found",
            ServiceError::Storage(StorageError::InvalidSignature) => "invalid_signature",
            ServiceError::Storage(StorageError::Expired { .. }) => "access_url_expired",
            ServiceError::Storage(_) => "storage_error",
            ServiceError::Registry(_) => "registry_error",
            ServiceError::Queue(_) => "queue_error",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }

    /// Whether the error describes a bad message rather than a backend fault.
    ///
    /// Redelivering such a message can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidRequest { .. }
                | ServiceError::Queue(QueueError::MalformedMessage(_))
        )
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        // Backend details stay in the logs
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An internal error happened while processing the request".to_string()
        } else {
            self.to_string()
        };

        let response = ErrorResponse {
            message,
            code: Some(code),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error and all of its sources as a single line for logging.
pub fn format_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
