//! Document store capability and its backends.
//!
//! `DocumentStore` is the seam the service depends on. `Database` persists
//! records in SQLite; `MemoryDocumentStore` keeps them in process.

mod documents;
mod memory;
mod migrations;
pub mod models;

pub use memory::MemoryDocumentStore;
pub use models::{DocumentRecord, DocumentStatus, ExtractedData};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{DatabaseError, ServiceError, ServiceResult};

/// Persistence for document records.
pub trait DocumentStore: Send + Sync {
    /// Get a document by ID
    fn get_document(&self, document_id: &str) -> ServiceResult<Option<DocumentRecord>>;

    /// Get a document by the locator of its stored file
    fn get_document_by_url(&self, document_url: &str) -> ServiceResult<Option<DocumentRecord>>;

    /// Insert or replace a document
    fn put_document(&self, document: &DocumentRecord) -> ServiceResult<()>;
}

/// Database manager for SQLite operations
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> ServiceResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ServiceError::Database(DatabaseError::Connection(
                    rusqlite::Error::ToSqlConversionFailure(Box::new(e)),
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(DatabaseError::Connection)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(DatabaseError::Query)?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> ServiceResult<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::Connection)?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> ServiceResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ServiceError::Internal {
            message: "database connection mutex poisoned".to_string(),
        })
    }
}
