//! Document operations backed by SQLite.

use rusqlite::{OptionalExtension, params};

use super::models::DocumentRecord;
use super::{Database, DocumentStore};
use crate::error::{DatabaseError, ServiceResult};

const SELECT_DOCUMENT: &str = "SELECT document_id, document_url, status, document_type, \
     extracted_data, created_at FROM documents";

impl DocumentStore for Database {
    fn get_document(&self, document_id: &str) -> ServiceResult<Option<DocumentRecord>> {
        let conn = self.connection()?;

        conn.query_row(
            &format!("{SELECT_DOCUMENT} WHERE document_id = ?1"),
            params![document_id],
            DocumentRecord::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    fn get_document_by_url(&self, document_url: &str) -> ServiceResult<Option<DocumentRecord>> {
        let conn = self.connection()?;

        conn.query_row(
            &format!("{SELECT_DOCUMENT} WHERE document_url = ?1"),
            params![document_url],
            DocumentRecord::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    fn put_document(&self, document: &DocumentRecord) -> ServiceResult<()> {
        let conn = self.connection()?;

        let extracted_data_json = document
            .extracted_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(DatabaseError::Serialization)?;

        // document_url and created_at are fixed once the row exists
        conn.execute(
            r#"
            INSERT INTO documents (document_id, document_url, status, document_type, extracted_data, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(document_id) DO UPDATE SET
                status = excluded.status,
                document_type = excluded.document_type,
                extracted_data = excluded.extracted_data
            "#,
            params![
                document.document_id,
                document.document_url,
                document.status.to_string(),
                document.document_type,
                extracted_data_json,
                document.created_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DocumentStatus, ExtractedData};
    use tempfile::TempDir;

    #[test]
    fn test_put_and_get_document() {
        let db = Database::open_in_memory().unwrap();
        let record = DocumentRecord::new("doc-1", "blob://b/input/doc-1_a.pdf");

        db.put_document(&record).unwrap();

        let by_id = db.get_document("doc-1").unwrap().unwrap();
        assert_eq!(by_id.document_url, "blob://b/input/doc-1_a.pdf");
        assert_eq!(by_id.status, DocumentStatus::Processing);
        assert!(by_id.extracted_data.is_none());

        let by_url = db
            .get_document_by_url("blob://b/input/doc-1_a.pdf")
            .unwrap()
            .unwrap();
        assert_eq!(by_url.document_id, "doc-1");
    }

    #[test]
    fn test_missing_document_is_none() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.get_document("doc-1").unwrap().is_none());
        assert!(db.get_document_by_url("blob://x").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces_extraction_fields() {
        let db = Database::open_in_memory().unwrap();
        let mut record = DocumentRecord::new("doc-1", "blob://x");
        db.put_document(&record).unwrap();

        let mut data = ExtractedData::new();
        data.insert("1. NAME (Last, First, Middle)".to_string(), "Doe, Jane".into());
        record.complete(Some("DD214".to_string()), data);
        db.put_document(&record).unwrap();

        let stored = db.get_document("doc-1").unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Completed);
        assert_eq!(stored.document_type.as_deref(), Some("DD214"));
        assert_eq!(
            stored.extracted_data.unwrap()["1. NAME (Last, First, Middle)"],
            "Doe, Jane"
        );
    }

    #[test]
    fn test_document_url_is_unique() {
        let db = Database::open_in_memory().unwrap();
        db.put_document(&DocumentRecord::new("doc-1", "blob://x"))
            .unwrap();

        let result = db.put_document(&DocumentRecord::new("doc-2", "blob://x"));
        assert!(result.is_err());
    }

    #[test]
    fn test_documents_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("documents.db");

        {
            let db = Database::open(&path).unwrap();
            db.put_document(&DocumentRecord::new("doc-1", "blob://x"))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.get_document("doc-1").unwrap().is_some());
    }
}
