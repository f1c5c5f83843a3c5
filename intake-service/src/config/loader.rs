//! Configuration loading from files and environment variables.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};

use crate::error::{ServiceError, ServiceResult};

use super::static_config::StaticConfig;

/// Prefix of environment variables that override file settings
const ENV_PREFIX: &str = "INTAKE";

/// Load static configuration from an optional `config` file and env vars
pub fn load_static_config() -> ServiceResult<StaticConfig> {
    build_static_config(
        Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            ),
    )
}

fn build_static_config(builder: ConfigBuilder<DefaultState>) -> ServiceResult<StaticConfig> {
    builder
        .build()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to deserialize static config: {}", e),
        })
}
