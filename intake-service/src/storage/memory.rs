//! In-process blob store.

use dashmap::DashMap;

use super::{BlobLocator, BlobStore, UrlSigner};
use crate::error::{ServiceResult, StorageError};

/// Blob store that keeps file contents in memory, keyed by locator.
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
    signer: UrlSigner,
}

impl MemoryBlobStore {
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            blobs: DashMap::new(),
            signer,
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn put_blob(&self, bucket: &str, key: &str, content: &[u8]) -> ServiceResult<String> {
        let locator = BlobLocator::new(bucket, key)?.to_string();
        self.blobs.insert(locator.clone(), content.to_vec());
        Ok(locator)
    }

    fn get_blob(&self, locator: &str) -> ServiceResult<Vec<u8>> {
        self.blobs
            .get(locator)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| {
                StorageError::NotFound {
                    locator: locator.to_string(),
                }
                .into()
            })
    }

    fn access_url(&self, locator: &str) -> ServiceResult<String> {
        let parsed: BlobLocator = locator.parse()?;
        Ok(self
            .signer
            .signed_url(&parsed, chrono::Utc::now().timestamp())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_blob_store() {
        let store = MemoryBlobStore::new(UrlSigner::new("secret", 60, "http://localhost:8080"));

        let locator = store.put_blob("b", "input/a.pdf", b"hello").unwrap();
        assert_eq!(locator, "blob://b/input/a.pdf");
        assert_eq!(store.get_blob(&locator).unwrap(), b"hello");
        assert!(store.get_blob("blob://b/input/missing.pdf").is_err());
    }
}
