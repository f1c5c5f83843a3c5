//! Database model structs.
//!
//! This module contains the data structures for database records.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Extracted field values keyed by the query that produced them
pub type ExtractedData = serde_json::Map<String, serde_json::Value>;

/// Processing status for documents
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentStatus {
    /// Uploaded, waiting for an extraction result
    #[default]
    Processing,
    /// Extraction result has been stored
    Completed,
}

/// Document record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    /// Locator of the stored file (`blob://{bucket}/{key}`)
    pub document_url: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractedData>,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// A freshly uploaded document awaiting extraction.
    pub fn new(document_id: impl Into<String>, document_url: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            document_url: document_url.into(),
            status: DocumentStatus::Processing,
            document_type: None,
            extracted_data: None,
            created_at: Utc::now(),
        }
    }

    /// Record an extraction result and mark the document completed.
    ///
    /// Applying the same result again leaves the record unchanged.
    pub fn complete(&mut self, document_type: Option<String>, extracted_data: ExtractedData) {
        self.document_type = document_type;
        self.extracted_data = Some(extracted_data);
        self.status = DocumentStatus::Completed;
    }

    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status_str: String = row.get(2)?;
        let extracted_data_str: Option<String> = row.get(4)?;
        let created_at_str: String = row.get(5)?;

        let status = status_str.parse::<DocumentStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let extracted_data = extracted_data_str
            .map(|s| serde_json::from_str::<ExtractedData>(&s))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(Self {
            document_id: row.get(0)?,
            document_url: row.get(1)?,
            status,
            document_type: row.get(3)?,
            extracted_data,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
