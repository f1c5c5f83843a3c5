//! Inbound queue of extraction results.
//!
//! Delivery is at-least-once: a received message stays in the queue until it
//! is deleted, so a consumer that fails midway sees it again on a later
//! receive. Messages that can never be applied are dead-lettered.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{QueueError, ServiceResult};

/// Subdirectory holding dead-lettered messages
const FAILED_DIRECTORY: &str = "failed";

/// Extension of message files in the spool directory
const MESSAGE_EXTENSION: &str = "json";

/// A received message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Handle used to delete or dead-letter this delivery
    pub receipt_handle: String,
    pub body: String,
}

/// Source of extraction result messages.
pub trait ResultQueue: Send + Sync {
    /// Receive up to `max` messages without removing them
    fn receive(&self, max: usize) -> ServiceResult<Vec<QueueMessage>>;

    /// Acknowledge a message so it is never delivered again
    fn delete(&self, receipt_handle: &str) -> ServiceResult<()>;

    /// Set aside a message that can never be processed
    fn dead_letter(&self, receipt_handle: &str) -> ServiceResult<()>;
}

/// Queue backed by a spool directory.
///
/// Each `*.json` file in the directory is one message and its path is the
/// receipt handle. Messages are delivered in file name order; dead letters
/// move to `failed/`.
pub struct SpoolQueue {
    dir: PathBuf,
}

impl SpoolQueue {
    /// Open the spool directory, creating it and its `failed/` subdirectory
    pub fn open(dir: impl Into<PathBuf>) -> ServiceResult<Self> {
        let dir = dir.into();
        let failed = dir.join(FAILED_DIRECTORY);
        std::fs::create_dir_all(&failed).map_err(|source| io_error(&failed, source))?;
        Ok(Self { dir })
    }

    fn handle_path(&self, receipt_handle: &str) -> ServiceResult<PathBuf> {
        let path = PathBuf::from(receipt_handle);
        // Only files directly inside the spool directory are valid handles
        if path.parent() != Some(self.dir.as_path()) {
            return Err(io_error(
                &path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "receipt handle outside spool directory",
                ),
            )
            .into());
        }
        Ok(path)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> QueueError {
    QueueError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Check if a path names a message file.
fn is_message_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(MESSAGE_EXTENSION))
            .unwrap_or(false)
}

impl ResultQueue for SpoolQueue {
    fn receive(&self, max: usize) -> ServiceResult<Vec<QueueMessage>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_message_file(p))
            .collect();

        // Sort by path for deterministic ordering
        paths.sort();

        let mut messages = Vec::new();
        for path in paths.into_iter().take(max) {
            match std::fs::read_to_string(&path) {
                Ok(body) => messages.push(QueueMessage {
                    receipt_handle: path.display().to_string(),
                    body,
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Deleted by a concurrent consumer between listing and reading
                    continue;
                }
                Err(e) => return Err(io_error(&path, e).into()),
            }
        }

        Ok(messages)
    }

    fn delete(&self, receipt_handle: &str) -> ServiceResult<()> {
        let path = self.handle_path(receipt_handle)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            // Already acknowledged
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e).into()),
        }
    }

    fn dead_letter(&self, receipt_handle: &str) -> ServiceResult<()> {
        let path = self.handle_path(receipt_handle)?;
        let Some(file_name) = path.file_name() else {
            return Ok(());
        };
        let dest = self.dir.join(FAILED_DIRECTORY).join(file_name);

        if let Err(e) = std::fs::rename(&path, &dest) {
            warn!(
                file = %path.display(),
                dest = %dest.display(),
                error = %e,
                "Failed to move message to failed/"
            );
            return Err(io_error(&path, e).into());
        }
        Ok(())
    }
}
