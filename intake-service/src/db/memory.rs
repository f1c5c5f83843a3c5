//! In-process document store.

use dashmap::DashMap;

use super::{DocumentRecord, DocumentStore};
use crate::error::ServiceResult;

/// Document store that keeps records in memory.
///
/// Records are lost on restart.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<String, DocumentRecord>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get_document(&self, document_id: &str) -> ServiceResult<Option<DocumentRecord>> {
        Ok(self.documents.get(document_id).map(|d| d.value().clone()))
    }

    fn get_document_by_url(&self, document_url: &str) -> ServiceResult<Option<DocumentRecord>> {
        Ok(self
            .documents
            .iter()
            .find(|entry| entry.value().document_url == document_url)
            .map(|entry| entry.value().clone()))
    }

    fn put_document(&self, document: &DocumentRecord) -> ServiceResult<()> {
        self.documents
            .insert(document.document_id.clone(), document.clone());
        Ok(())
    }
}
