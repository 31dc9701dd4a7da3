//! Gateway configuration.
//!
//! Aggregates the bus, permission and fieldmapper settings into a single
//! Config struct that can be loaded from YAML files or environment variables.

use serde::Deserialize;

use crate::error::{GatewayError, Result};
use crate::fieldmapper::FieldmapperConfig;
use crate::permissions::PermissionConfig;
use crate::rpc::BusConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "ilsgw.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "ILSGW_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "ILSGW";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "ILSGW_LOG";

/// Main gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bus endpoint and retry policy.
    pub bus: BusConfig,
    /// Permission check method and candidate signatures.
    pub permissions: PermissionConfig,
    /// Field table sources.
    pub fieldmapper: FieldmapperConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `ilsgw.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, `__` between
    ///    nesting levels (e.g. `ILSGW_BUS__GATEWAY_URL`)
    pub fn load(path: Option<&str>) -> Result<Self> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?;

        config.try_deserialize().map_err(config_error)
    }
}

fn config_error(err: ::config::ConfigError) -> GatewayError {
    GatewayError::Config(err.to_string())
}
