//! Service configuration.
//!
//! Settings come from an optional `config` file in the working directory,
//! overridden by `INTAKE__SECTION__KEY` environment variables.

mod loader;
mod static_config;

pub use loader::load_static_config;
pub use static_config::{
    BlobBackend, DocumentBackend, LimitsConfig, QueueConfig, ServerConfig, SigningConfig,
    StaticConfig, StorageConfig,
};
