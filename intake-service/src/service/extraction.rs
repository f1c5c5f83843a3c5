//! Persistence of extraction results.

use serde::Deserialize;

use crate::db::ExtractedData;
use crate::error::{ServiceError, ServiceResult};
use crate::service::DocumentService;

/// Message emitted by the extraction pipeline for one uploaded document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractionResult {
    pub document_url: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub extracted_data: Option<ExtractedData>,
}

impl DocumentService {
    /// Complete the document stored at `document_url` with an extraction result.
    ///
    /// Safe to apply more than once: the same result always produces the
    /// same record.
    pub fn update_document(
        &self,
        document_url: &str,
        document_type: Option<String>,
        extracted_data: ExtractedData,
    ) -> ServiceResult<()> {
        let mut record = self
            .documents
            .get_document_by_url(document_url)?
            .ok_or_else(|| ServiceError::DocumentUrlNotFound {
                document_url: document_url.to_string(),
            })?;

        record.complete(document_type, extracted_data);
        self.documents.put_document(&record)
    }

    /// Apply a decoded extraction result message
    pub fn apply_extraction_result(&self, result: ExtractionResult) -> ServiceResult<()> {
        self.update_document(
            &result.document_url,
            result.document_type,
            result.extracted_data.unwrap_or_default(),
        )
    }
}
