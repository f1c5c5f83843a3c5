//! Background consumer that persists extraction results.
//!
//! Polls the result queue and completes the matching documents. A message is
//! deleted only after its result is stored; backend failures leave it in the
//! queue for redelivery, and messages that can never apply are dead-lettered.
//! A result for a document that is not stored yet is retried for a bounded
//! number of deliveries, since the file can reach the pipeline before its
//! record is written.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, error, info, warn};

use crate::error::{QueueError, ServiceError, ServiceResult, format_error_chain};
use crate::forms::FORMS;
use crate::queue::{QueueMessage, ResultQueue};
use crate::service::{DocumentService, ExtractionResult};

/// Outcome counts for one batch of messages
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: usize,
    pub dead_lettered: usize,
    /// Left in the queue after a backend failure or for a document not stored yet
    pub retained: usize,
    /// Applied, but the queue refused the acknowledgement
    pub unacknowledged: usize,
}

impl BatchSummary {
    /// Whether the batch removed messages, so another poll may find more work
    fn made_progress(&self) -> bool {
        self.applied > 0 || self.dead_lettered > 0
    }
}

/// Deliveries seen per receipt handle for results naming an unknown document
#[derive(Debug, Default)]
pub struct PendingResults {
    attempts: DashMap<String, u32>,
}

impl PendingResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more delivery, returning the total so far
    fn record_attempt(&self, receipt_handle: &str) -> u32 {
        let mut attempts = self
            .attempts
            .entry(receipt_handle.to_string())
            .or_insert(0);
        *attempts += 1;
        *attempts
    }

    fn forget(&self, receipt_handle: &str) {
        self.attempts.remove(receipt_handle);
    }
}

/// Worker settings
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub batch_size: usize,
    pub poll_interval: Duration,
    /// Deliveries of a result for an unknown document before it is dead-lettered
    pub max_unknown_document_attempts: u32,
}

/// Start the extraction result worker.
///
/// This should be called once on server startup if a result queue is configured.
pub fn start_extraction_result_worker(
    service: Arc<DocumentService>,
    queue: Arc<dyn ResultQueue>,
    options: WorkerOptions,
) {
    tokio::spawn(poll_results(service, queue, options));
}

async fn poll_results(
    service: Arc<DocumentService>,
    queue: Arc<dyn ResultQueue>,
    options: WorkerOptions,
) {
    info!("Extraction result worker started");
    let pending = PendingResults::new();
    loop {
        match process_batch(
            &service,
            queue.as_ref(),
            options.batch_size,
            &pending,
            options.max_unknown_document_attempts,
        ) {
            Ok(summary) if summary.made_progress() => {
                debug!(?summary, "Processed extraction result batch");
                // Check for more messages right away, but let other tasks run
                tokio::task::yield_now().await;
                continue;
            }
            Ok(summary) => {
                if summary.retained > 0 || summary.unacknowledged > 0 {
                    warn!(
                        retained = summary.retained,
                        unacknowledged = summary.unacknowledged,
                        "Extraction results left in the queue for redelivery"
                    );
                }
                tokio::time::sleep(options.poll_interval).await;
            }
            Err(e) => {
                error!(error = %format_error_chain(&e), "Failed to receive extraction results");
                tokio::time::sleep(options.poll_interval).await;
            }
        }
    }
}

/// Receive and handle up to `max` messages.
pub fn process_batch(
    service: &DocumentService,
    queue: &dyn ResultQueue,
    max: usize,
    pending: &PendingResults,
    max_unknown_document_attempts: u32,
) -> ServiceResult<BatchSummary> {
    let mut summary = BatchSummary::default();

    for message in queue.receive(max)? {
        let QueueMessage {
            receipt_handle,
            body,
        } = message;

        match handle_message(service, &body) {
            Ok(document_url) => {
                pending.forget(&receipt_handle);
                match queue.delete(&receipt_handle) {
                    Ok(()) => {
                        info!(document_url = %document_url, "Saved extraction result");
                        summary.applied += 1;
                    }
                    Err(e) => {
                        // Redelivery is harmless since updates are idempotent
                        warn!(
                            receipt_handle = %receipt_handle,
                            error = %format_error_chain(&e),
                            "Saved extraction result but failed to delete its message"
                        );
                        summary.unacknowledged += 1;
                    }
                }
            }
            Err(ServiceError::DocumentUrlNotFound { document_url }) => {
                let attempts = pending.record_attempt(&receipt_handle);
                if attempts < max_unknown_document_attempts {
                    warn!(
                        receipt_handle = %receipt_handle,
                        document_url = %document_url,
                        attempts,
                        "No document stored for extraction result yet, will retry"
                    );
                    summary.retained += 1;
                } else {
                    warn!(
                        receipt_handle = %receipt_handle,
                        document_url = %document_url,
                        attempts,
                        "No document stored for extraction result, dead-lettering"
                    );
                    queue.dead_letter(&receipt_handle)?;
                    pending.forget(&receipt_handle);
                    summary.dead_lettered += 1;
                }
            }
            Err(e) if e.is_permanent() => {
                warn!(
                    receipt_handle = %receipt_handle,
                    error = %format_error_chain(&e),
                    "Extraction result cannot be applied, dead-lettering"
                );
                queue.dead_letter(&receipt_handle)?;
                pending.forget(&receipt_handle);
                summary.dead_lettered += 1;
            }
            Err(e) => {
                error!(
                    receipt_handle = %receipt_handle,
                    error = %format_error_chain(&e),
                    "An internal error happened while trying to save a document to the database"
                );
                summary.retained += 1;
            }
        }
    }

    Ok(summary)
}

/// Decode and apply one message body, returning the document URL it completed.
fn handle_message(service: &DocumentService, body: &str) -> ServiceResult<String> {
    let result: ExtractionResult =
        serde_json::from_str(body).map_err(QueueError::MalformedMessage)?;

    if let Some(document_type) = &result.document_type
        && FORMS.get(document_type).is_none()
    {
        warn!(
            document_url = %result.document_url,
            document_type = %document_type,
            "Extraction result names an unknown form type"
        );
    }

    let document_url = result.document_url.clone();
    service.apply_extraction_result(result)?;
    Ok(document_url)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use super::*;
    use crate::db::{DocumentRecord, DocumentStatus, DocumentStore, MemoryDocumentStore};
    use crate::queue::SpoolQueue;
    use crate::service::test_support::{BrokenDocumentStore, RecordingBlobStore};

    const ATTEMPTS: u32 = 3;

    fn write_message(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    fn service_with(documents: Arc<dyn DocumentStore>) -> DocumentService {
        DocumentService::new(documents, Arc::new(RecordingBlobStore::new("u", b"")))
    }

    fn run_batch(service: &DocumentService, queue: &dyn ResultQueue) -> BatchSummary {
        process_batch(service, queue, 10, &PendingResults::new(), ATTEMPTS).unwrap()
    }

    /// Queue holding one valid result that refuses every acknowledgement
    struct UndeletableQueue {
        receives: AtomicUsize,
    }

    impl ResultQueue for UndeletableQueue {
        fn receive(&self, _max: usize) -> ServiceResult<Vec<QueueMessage>> {
            self.receives.fetch_add(1, Ordering::SeqCst);
            Ok(vec![QueueMessage {
                receipt_handle: "001.json".to_string(),
                body: r#"{"document_url": "blob://x"}"#.to_string(),
            }])
        }

        fn delete(&self, receipt_handle: &str) -> ServiceResult<()> {
            Err(QueueError::Io {
                path: receipt_handle.to_string(),
                source: std::io::Error::other("read-only spool"),
            }
            .into())
        }

        fn dead_letter(&self, _receipt_handle: &str) -> ServiceResult<()> {
            Ok(())
        }
    }

    fn stored_document() -> Arc<MemoryDocumentStore> {
        let documents = Arc::new(MemoryDocumentStore::new());
        documents
            .put_document(&DocumentRecord::new("doc-2", "blob://x"))
            .unwrap();
        documents
    }

    #[test]
    fn test_applies_and_deletes_messages() {
        let dir = TempDir::new().unwrap();
        let queue = SpoolQueue::open(dir.path()).unwrap();
        let documents = stored_document();
        let service = service_with(documents.clone());

        write_message(
            dir.path(),
            "001.json",
            r#"{"document_url": "blob://x", "document_type": "DD214", "extracted_data": {"1. NAME": "Jane Doe"}}"#,
        );

        let summary = run_batch(&service, &queue);

        assert_eq!(summary.applied, 1);
        assert!(queue.receive(10).unwrap().is_empty());

        let record = documents.get_document("doc-2").unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Completed);
        assert_eq!(record.document_type.as_deref(), Some("DD214"));
    }

    #[test]
    fn test_duplicate_delivery_is_harmless() {
        let dir = TempDir::new().unwrap();
        let queue = SpoolQueue::open(dir.path()).unwrap();
        let service = service_with(stored_document());

        let body = r#"{"document_url": "blob://x", "document_type": "DD214", "extracted_data": {}}"#;
        write_message(dir.path(), "001.json", body);
        write_message(dir.path(), "002.json", body);

        let summary = run_batch(&service, &queue);

        assert_eq!(summary.applied, 2);
        assert_eq!(summary.retained, 0);
    }

    #[test]
    fn test_dead_letters_malformed_messages() {
        let dir = TempDir::new().unwrap();
        let queue = SpoolQueue::open(dir.path()).unwrap();
        let service = service_with(Arc::new(MemoryDocumentStore::new()));

        write_message(dir.path(), "001.json", r#"{"document_type": "DD214"}"#);
        write_message(dir.path(), "002.json", "not json");

        let summary = run_batch(&service, &queue);

        assert_eq!(summary.dead_lettered, 2);
        assert!(queue.receive(10).unwrap().is_empty());
        assert!(dir.path().join("failed/001.json").exists());
        assert!(dir.path().join("failed/002.json").exists());
    }

    #[test]
    fn test_unknown_document_is_retried_until_stored() {
        let dir = TempDir::new().unwrap();
        let queue = SpoolQueue::open(dir.path()).unwrap();
        let documents = Arc::new(MemoryDocumentStore::new());
        let service = service_with(documents.clone());
        let pending = PendingResults::new();

        write_message(dir.path(), "001.json", r#"{"document_url": "blob://x"}"#);

        let summary = process_batch(&service, &queue, 10, &pending, ATTEMPTS).unwrap();
        assert_eq!(summary.retained, 1);
        assert!(!summary.made_progress());
        assert_eq!(queue.receive(10).unwrap().len(), 1);

        // The record lands after the result was first delivered
        documents
            .put_document(&DocumentRecord::new("doc-2", "blob://x"))
            .unwrap();

        let summary = process_batch(&service, &queue, 10, &pending, ATTEMPTS).unwrap();
        assert_eq!(summary.applied, 1);
        assert!(queue.receive(10).unwrap().is_empty());
        assert_eq!(
            documents.get_document("doc-2").unwrap().unwrap().status,
            DocumentStatus::Completed
        );
    }

    #[test]
    fn test_unknown_document_is_dead_lettered_after_max_attempts() {
        let dir = TempDir::new().unwrap();
        let queue = SpoolQueue::open(dir.path()).unwrap();
        let service = service_with(Arc::new(MemoryDocumentStore::new()));
        let pending = PendingResults::new();

        write_message(dir.path(), "001.json", r#"{"document_url": "blob://nowhere"}"#);

        for _ in 1..ATTEMPTS {
            let summary = process_batch(&service, &queue, 10, &pending, ATTEMPTS).unwrap();
            assert_eq!(summary.retained, 1);
        }

        let summary = process_batch(&service, &queue, 10, &pending, ATTEMPTS).unwrap();
        assert_eq!(summary.dead_lettered, 1);
        assert!(queue.receive(10).unwrap().is_empty());
        assert!(dir.path().join("failed/001.json").exists());
    }

    #[test]
    fn test_backend_failure_keeps_message_for_redelivery() {
        let dir = TempDir::new().unwrap();
        let queue = SpoolQueue::open(dir.path()).unwrap();
        let service = service_with(Arc::new(BrokenDocumentStore));

        write_message(dir.path(), "001.json", r#"{"document_url": "blob://x"}"#);

        let summary = run_batch(&service, &queue);

        assert_eq!(summary.retained, 1);
        assert!(!summary.made_progress());
        assert_eq!(queue.receive(10).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_delete_is_not_progress() {
        let queue = UndeletableQueue {
            receives: AtomicUsize::new(0),
        };
        let service = service_with(stored_document());

        let summary = run_batch(&service, &queue);

        assert_eq!(summary.applied, 0);
        assert_eq!(summary.unacknowledged, 1);
        assert!(!summary.made_progress());
    }

    #[tokio::test]
    async fn test_worker_waits_when_deletes_fail() {
        let queue = Arc::new(UndeletableQueue {
            receives: AtomicUsize::new(0),
        });
        let service = Arc::new(service_with(stored_document()));
        let options = WorkerOptions {
            batch_size: 10,
            poll_interval: Duration::from_secs(5),
            max_unknown_document_attempts: ATTEMPTS,
        };

        let worker = tokio::spawn(poll_results(service, queue.clone(), options));
        tokio::time::sleep(Duration::from_millis(200)).await;
        worker.abort();

        assert!(queue.receives.load(Ordering::SeqCst) <= 2);
    }
}
