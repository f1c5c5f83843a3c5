//! Document lifecycle operations.
//!
//! `DocumentService` composes a document store and a blob store:
//! - Retrieval of a record together with a signed URL and the file bytes
//! - Upload of a new file, creating a record in `processing` status
//! - Completion of a record from an extraction result
//!
//! The service never logs and never recovers from store failures; callers
//! decide how to surface them.

mod extraction;
mod retrieval;
mod upload;

pub use extraction::ExtractionResult;
pub use retrieval::RetrievedDocument;
pub use upload::CreatedDocument;

use std::sync::Arc;

use crate::db::DocumentStore;
use crate::error::RegistryError;
use crate::registry::Registry;
use crate::storage::BlobStore;

/// Main service coordinator
pub struct DocumentService {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    max_document_size_bytes: u64,
}

impl DocumentService {
    /// Create a service over explicit store implementations, with no upload size limit
    #[allow(dead_code)]
    pub fn new(documents: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            documents,
            blobs,
            max_document_size_bytes: u64::MAX,
        }
    }

    pub fn builder() -> DocumentServiceBuilder {
        DocumentServiceBuilder::default()
    }

    /// Blob store backing this service
    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }
}

/// Assembles a `DocumentService` from explicit overrides and a registry.
///
/// Stores supplied through `with_*` win; any left unset are resolved from
/// the registry when building.
#[derive(Default)]
pub struct DocumentServiceBuilder {
    documents: Option<Arc<dyn DocumentStore>>,
    blobs: Option<Arc<dyn BlobStore>>,
    max_document_size_bytes: Option<u64>,
}

impl DocumentServiceBuilder {
    pub fn with_document_store(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn max_document_size_bytes(mut self, max: u64) -> Self {
        self.max_document_size_bytes = Some(max);
        self
    }

    /// Fill unset stores from `registry` and build the service.
    pub fn build_from(self, registry: &Registry) -> Result<DocumentService, RegistryError> {
        let documents = match self.documents {
            Some(documents) => documents,
            None => registry.resolve::<dyn DocumentStore>()?,
        };
        let blobs = match self.blobs {
            Some(blobs) => blobs,
            None => registry.resolve::<dyn BlobStore>()?,
        };

        Ok(DocumentService {
            documents,
            blobs,
            max_document_size_bytes: self.max_document_size_bytes.unwrap_or(u64::MAX),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingBlobStore;
    use super::*;
    use crate::db::MemoryDocumentStore;

    #[test]
    fn test_build_from_registry() {
        let registry = Registry::new();
        registry.register::<dyn DocumentStore>(Arc::new(MemoryDocumentStore::new()));
        registry.register::<dyn BlobStore>(Arc::new(RecordingBlobStore::new("u", b"")));

        assert!(DocumentService::builder().build_from(&registry).is_ok());
    }

    #[test]
    fn test_explicit_stores_override_registry() {
        let registry = Registry::new();
        registry.register::<dyn DocumentStore>(Arc::new(MemoryDocumentStore::new()));

        // Blob store supplied directly, document store defaulted from the registry
        let blobs: Arc<dyn BlobStore> = Arc::new(RecordingBlobStore::new("u", b""));
        let service = DocumentService::builder()
            .with_blob_store(blobs.clone())
            .build_from(&registry)
            .unwrap();

        assert!(Arc::ptr_eq(service.blobs(), &blobs));
    }

    #[test]
    fn test_build_fails_on_unbound_capability() {
        let registry = Registry::new();
        registry.register::<dyn DocumentStore>(Arc::new(MemoryDocumentStore::new()));

        let err = DocumentService::builder()
            .build_from(&registry)
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::UnboundCapability { capability } if capability.contains("BlobStore")));
    }

    #[test]
    fn test_build_fails_after_reset() {
        let registry = Registry::new();
        registry.register::<dyn DocumentStore>(Arc::new(MemoryDocumentStore::new()));
        registry.register::<dyn BlobStore>(Arc::new(RecordingBlobStore::new("u", b"")));
        registry.reset();

        assert!(DocumentService::builder().build_from(&registry).is_err());
    }
}
