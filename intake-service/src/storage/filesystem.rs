//! Blob store on the local filesystem.

use std::io::ErrorKind;
use std::path::PathBuf;

use super::{BlobLocator, BlobStore, UrlSigner};
use crate::error::{ServiceResult, StorageError};

/// Stores each blob at `{root}/{bucket}/{key}`.
pub struct FilesystemBlobStore {
    root: PathBuf,
    signer: UrlSigner,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>, signer: UrlSigner) -> Self {
        Self {
            root: root.into(),
            signer,
        }
    }

    fn path_for(&self, locator: &BlobLocator) -> PathBuf {
        let mut path = self.root.join(&locator.bucket);
        for segment in locator.key.split('/') {
            path.push(segment);
        }
        path
    }
}

impl BlobStore for FilesystemBlobStore {
    fn put_blob(&self, bucket: &str, key: &str, content: &[u8]) -> ServiceResult<String> {
        let locator = BlobLocator::new(bucket, key)?;
        let path = self.path_for(&locator);

        let io_error = |source| StorageError::Io {
            locator: locator.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(&path, content).map_err(io_error)?;

        Ok(locator.to_string())
    }

    fn get_blob(&self, locator: &str) -> ServiceResult<Vec<u8>> {
        let parsed: BlobLocator = locator.parse()?;

        std::fs::read(self.path_for(&parsed)).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StorageError::NotFound {
                    locator: locator.to_string(),
                }
                .into()
            } else {
                StorageError::Io {
                    locator: locator.to_string(),
                    source,
                }
                .into()
            }
        })
    }

    fn access_url(&self, locator: &str) -> ServiceResult<String> {
        let parsed: BlobLocator = locator.parse()?;
        Ok(self
            .signer
            .signed_url(&parsed, chrono::Utc::now().timestamp())?)
    }
}
