//! Blob storage capability and its backends.
//!
//! Stored files are addressed by locators of the form
//! `blob://{bucket}/{key}`. Backends hand out time-limited signed URLs that
//! the API's blob endpoint verifies before serving bytes.

mod filesystem;
mod memory;
mod signing;

pub use filesystem::FilesystemBlobStore;
pub use memory::MemoryBlobStore;
pub use signing::UrlSigner;

use std::fmt;
use std::str::FromStr;

use crate::error::{ServiceResult, StorageError};

/// URI scheme of blob locators
pub const LOCATOR_SCHEME: &str = "blob://";

/// Raw file storage.
pub trait BlobStore: Send + Sync {
    /// Store bytes under `bucket`/`key`, returning the locator of the new blob
    fn put_blob(&self, bucket: &str, key: &str, content: &[u8]) -> ServiceResult<String>;

    /// Fetch the bytes behind a locator
    fn get_blob(&self, locator: &str) -> ServiceResult<Vec<u8>>;

    /// Produce a time-limited URL granting read access to a locator
    fn access_url(&self, locator: &str) -> ServiceResult<String>;
}

/// Parsed `blob://{bucket}/{key}` locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobLocator {
    pub bucket: String,
    pub key: String,
}

impl BlobLocator {
    /// Build a locator, rejecting keys that could escape their bucket.
    pub fn new(bucket: &str, key: &str) -> Result<Self, StorageError> {
        let invalid = || StorageError::InvalidLocator {
            locator: format!("{LOCATOR_SCHEME}{bucket}/{key}"),
        };

        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(invalid());
        }
        if key.is_empty() || key.contains('\\') {
            return Err(invalid());
        }
        if key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(invalid());
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl FromStr for BlobLocator {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(LOCATOR_SCHEME)
            .ok_or_else(|| StorageError::InvalidLocator {
                locator: s.to_string(),
            })?;
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidLocator {
                locator: s.to_string(),
            })?;

        Self::new(bucket, key)
    }
}

impl fmt::Display for BlobLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LOCATOR_SCHEME}{}/{}", self.bucket, self.key)
    }
}
