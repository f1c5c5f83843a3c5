use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

mod api;
mod config;
mod db;
mod error;
mod forms;
mod queue;
mod registry;
mod service;
mod storage;
mod worker;

use crate::config::{BlobBackend, DocumentBackend, StaticConfig, load_static_config};
use crate::db::{Database, DocumentStore, MemoryDocumentStore};
use crate::error::ServiceResult;
use crate::queue::{ResultQueue, SpoolQueue};
use crate::registry::Registry;
use crate::service::DocumentService;
use crate::storage::{BlobStore, FilesystemBlobStore, MemoryBlobStore, UrlSigner};
use crate::worker::WorkerOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!(
        "Starting document intake service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let static_config = load_static_config()?;

    info!(
        host = %static_config.server.host,
        port = static_config.server.port,
        document_backend = %static_config.storage.document_backend,
        blob_backend = %static_config.storage.blob_backend,
        "Static configuration loaded"
    );

    // Ensure data directory exists
    std::fs::create_dir_all(&static_config.storage.data_dir)?;

    if static_config.signing.uses_default_secret() {
        warn!("signing.secret is not set; signed URLs use the development secret");
    }
    let signer = Arc::new(UrlSigner::new(
        static_config.signing.secret.clone(),
        static_config.signing.url_ttl_secs,
        &static_config.signing.public_base_url,
    ));

    // Bind the configured backends, then build the service from them
    let registry = Registry::new();
    bind_backends(&registry, &static_config, &signer)?;
    info!(capabilities = ?registry.bound_capabilities(), "Backends bound");

    let service = Arc::new(
        DocumentService::builder()
            .max_document_size_bytes(static_config.limits.max_document_size_bytes)
            .build_from(&registry)?,
    );

    info!(forms = forms::FORMS.len(), "Form descriptors loaded");

    // Start extraction result worker if configured
    if let Some(inbox_dir) = &static_config.queue.inbox_dir {
        let queue: Arc<dyn ResultQueue> = Arc::new(SpoolQueue::open(inbox_dir)?);
        info!(path = %inbox_dir.display(), "Extraction result queue opened");
        worker::start_extraction_result_worker(
            service.clone(),
            queue,
            WorkerOptions {
                batch_size: static_config.queue.batch_size,
                poll_interval: static_config.queue.poll_interval(),
                max_unknown_document_attempts: static_config.queue.max_unknown_document_attempts,
            },
        );
    }

    // Build the router
    let app = api::router(service, signer, &static_config);

    // Start the server
    let addr = format!(
        "{}:{}",
        static_config.server.host, static_config.server.port
    );
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Register the document and blob store backends named by the configuration.
fn bind_backends(
    registry: &Registry,
    static_config: &StaticConfig,
    signer: &UrlSigner,
) -> ServiceResult<()> {
    let storage = &static_config.storage;

    let documents: Arc<dyn DocumentStore> = match storage.document_backend {
        DocumentBackend::Sqlite => {
            let db_path = storage.database_path();
            let db = Database::open(&db_path)?;
            info!(path = %db_path.display(), "Database initialized");
            Arc::new(db)
        }
        DocumentBackend::Memory => {
            warn!("Using the in-memory document store; records are lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };
    registry.register::<dyn DocumentStore>(documents);

    let blobs: Arc<dyn BlobStore> = match storage.blob_backend {
        BlobBackend::Filesystem => {
            let root = storage.blob_root();
            info!(path = %root.display(), "Blob storage initialized");
            Arc::new(FilesystemBlobStore::new(root, signer.clone()))
        }
        BlobBackend::Memory => {
            warn!("Using the in-memory blob store; files are lost on restart");
            Arc::new(MemoryBlobStore::new(signer.clone()))
        }
    };
    registry.register::<dyn BlobStore>(blobs);

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("intake_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
