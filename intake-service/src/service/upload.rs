//! Document upload.

use crate::db::DocumentRecord;
use crate::error::{ServiceError, ServiceResult};
use crate::service::DocumentService;

/// Identifiers of a newly uploaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedDocument {
    pub document_id: String,
    /// Key of the file within its bucket
    pub blob_key: String,
    /// Locator recorded as the document's URL
    pub document_url: String,
}

/// Sanitize a client-supplied file name for use in a storage key
fn sanitize_file_name(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

/// Storage key for a document: the folder, the document id, and the file name.
fn object_key(folder: &str, document_id: &str, file_name: &str) -> String {
    let folder = folder.trim_matches('/');
    let prefix = if folder.is_empty() {
        String::new()
    } else {
        format!("{folder}/")
    };

    let file_name = sanitize_file_name(file_name);
    if file_name.is_empty() {
        format!("{prefix}{document_id}")
    } else {
        format!("{prefix}{document_id}_{file_name}")
    }
}

impl DocumentService {
    /// Store a file and create its record in `processing` status.
    ///
    /// The extraction pipeline picks the file up from blob storage; its
    /// result later completes the record via `update_document`.
    pub fn create_document(
        &self,
        file_name: &str,
        file_content: &[u8],
        bucket: &str,
        folder: &str,
    ) -> ServiceResult<CreatedDocument> {
        let size = file_content.len() as u64;
        if size > self.max_document_size_bytes {
            return Err(ServiceError::FileTooLarge {
                size,
                max: self.max_document_size_bytes,
            });
        }

        let document_id = uuid::Uuid::new_v4().to_string();
        let blob_key = object_key(folder, &document_id, file_name);

        let document_url = self.blobs.put_blob(bucket, &blob_key, file_content)?;
        self.documents
            .put_document(&DocumentRecord::new(&document_id, &document_url))?;

        Ok(CreatedDocument {
            document_id,
            blob_key,
            document_url,
        })
    }
}
