//! Configuration read once at startup.
//! Changing any of these settings requires a restart.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use strum::Display;

/// Startup configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_signing")]
    pub signing: SigningConfig,

    #[serde(default = "default_queue")]
    pub queue: QueueConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Document store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentBackend {
    /// SQLite database in the data directory
    Sqlite,
    /// Process memory; records are lost on restart
    Memory,
}

/// Blob store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlobBackend {
    /// Files under `{data_dir}/blobs`
    Filesystem,
    /// Process memory; files are lost on restart
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_document_backend")]
    pub document_backend: DocumentBackend,

    #[serde(default = "default_blob_backend")]
    pub blob_backend: BlobBackend,

    /// Bucket that receives uploads
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Folder within the bucket that receives uploads
    #[serde(default = "default_upload_folder")]
    pub upload_folder: String,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("intake.db")
    }

    pub fn blob_root(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}

/// Signed access URL configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
    /// Secret mixed into every URL signature
    #[serde(default = "default_signing_secret")]
    pub secret: String,

    #[serde(default = "default_url_ttl_secs")]
    pub url_ttl_secs: u64,

    /// Base URL clients use to reach this service
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl SigningConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.secret == default_signing_secret()
    }
}

/// Extraction result queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Spool directory the extraction pipeline writes results to.
    /// The result worker is disabled when unset.
    #[serde(default)]
    pub inbox_dir: Option<PathBuf>,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Deliveries of a result naming an unknown document before it is dead-lettered
    #[serde(default = "default_max_unknown_document_attempts")]
    pub max_unknown_document_attempts: u32,
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Size limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_document_size")]
    pub max_document_size_bytes: u64,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            signing: default_signing(),
            queue: default_queue(),
            limits: default_limits(),
        }
    }
}

// ==================== Default Value Functions ====================

pub(crate) fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_storage() -> StorageConfig {
    StorageConfig {
        data_dir: default_data_dir(),
        document_backend: default_document_backend(),
        blob_backend: default_blob_backend(),
        bucket: default_bucket(),
        upload_folder: default_upload_folder(),
    }
}

pub(crate) fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_document_backend() -> DocumentBackend {
    DocumentBackend::Sqlite
}

fn default_blob_backend() -> BlobBackend {
    BlobBackend::Filesystem
}

fn default_bucket() -> String {
    "ocr-poc-flex".to_string()
}

fn default_upload_folder() -> String {
    "input/".to_string()
}

pub(crate) fn default_signing() -> SigningConfig {
    SigningConfig {
        secret: default_signing_secret(),
        url_ttl_secs: default_url_ttl_secs(),
        public_base_url: default_public_base_url(),
    }
}

fn default_signing_secret() -> String {
    "insecure-development-secret".to_string()
}

fn default_url_ttl_secs() -> u64 {
    3600
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

pub(crate) fn default_queue() -> QueueConfig {
    QueueConfig {
        inbox_dir: None,
        poll_interval_secs: default_poll_interval_secs(),
        batch_size: default_batch_size(),
        max_unknown_document_attempts: default_max_unknown_document_attempts(),
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_batch_size() -> usize {
    10
}

fn default_max_unknown_document_attempts() -> u32 {
    5
}

pub(crate) fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_document_size_bytes: default_max_document_size(),
    }
}

fn default_max_document_size() -> u64 {
    50 * 1024 * 1024
}
