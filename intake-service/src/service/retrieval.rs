//! Document retrieval.

use crate::db::DocumentRecord;
use crate::error::ServiceResult;
use crate::service::DocumentService;

/// A stored document with everything needed to hand it back to a client
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub record: DocumentRecord,
    /// Time-limited URL for the stored file
    pub access_url: String,
    pub content: Vec<u8>,
}

impl DocumentService {
    /// Get a document's record, a signed URL for its file, and the file bytes.
    ///
    /// Returns `Ok(None)` when no record exists; the blob store is not
    /// consulted in that case. Store errors are returned as-is.
    pub fn get_document(&self, document_id: &str) -> ServiceResult<Option<RetrievedDocument>> {
        let Some(record) = self.documents.get_document(document_id)? else {
            return Ok(None);
        };

        let access_url = self.blobs.access_url(&record.document_url)?;
        let content = self.blobs.get_blob(&record.document_url)?;

        Ok(Some(RetrievedDocument {
            record,
            access_url,
            content,
        }))
    }
}
