//! Database schema migrations.

use rusqlite::Connection;

use crate::error::{DatabaseError, ServiceResult};

/// Run all database migrations.
///
/// Called during database initialization to ensure the schema is up to date.
pub(super) fn run_migrations(conn: &Connection) -> ServiceResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            document_id TEXT PRIMARY KEY,
            document_url TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'processing',
            document_type TEXT,
            extracted_data TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Extraction results address documents by their stored file
        CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_url ON documents(document_url);
    "#,
    )
    .map_err(|e| DatabaseError::Migration {
        message: e.to_string(),
    })?;

    Ok(())
}
