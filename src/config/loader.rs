//! Configuration Loader
//!
//! Environment-aware configuration loading: a base `repository.yaml`, an
//! optional `repository.<environment>.yaml` overlay, then
//! `TABLE_REPOSITORY__<SECTION>__<KEY>` environment variables.

use super::error::{ConfigResult, ConfigurationError};
use super::RepositoryConfig;
use crate::constants::env as env_vars;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_NAME: &str = "repository.yaml";

/// Loaded configuration plus the environment it was resolved for
#[derive(Debug)]
pub struct ConfigManager {
    config: RepositoryConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            environment = %environment,
            table_name = %config.storage.table_name,
            queue_name = %config.queue.queue_name,
            partition_concurrency = config.parallelism.partition_concurrency,
            batch_concurrency = config.parallelism.batch_concurrency,
            "Configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an in-code configuration, validating it the same way as a loaded one
    pub fn from_config(config: RepositoryConfig, environment: &str) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            environment: environment.to_string(),
            config_directory: Self::default_config_directory(),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON with account keys masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<RepositoryConfig> {
        let base_path = config_directory.join(BASE_FILE_NAME);
        if !base_path.exists() {
            return Err(ConfigurationError::file_not_found(
                config_directory,
                BASE_FILE_NAME,
            ));
        }

        let overlay_path = config_directory.join(format!("repository.{environment}.yaml"));
        if overlay_path.exists() {
            debug!("Applying environment overlay: {}", overlay_path.display());
        }

        let merged = Config::builder()
            .add_source(File::from(base_path.as_path()).format(FileFormat::Yaml))
            .add_source(
                File::from(overlay_path.as_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(env_vars::CONFIG_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(merged.try_deserialize()?)
    }

    fn sanitize_config_for_logging(config: &RepositoryConfig) -> serde_json::Value {
        let mut sanitized = config.clone();
        sanitized.storage.connection_string =
            redact_connection_string(&sanitized.storage.connection_string);
        sanitized.queue.connection_string = sanitized
            .queue
            .connection_string
            .as_deref()
            .map(redact_connection_string);
        serde_json::to_value(&sanitized).unwrap_or(serde_json::Value::Null)
    }

    /// Detect current environment: TABLE_REPOSITORY_ENV || APP_ENV || 'development'
    fn detect_environment() -> String {
        env::var(env_vars::ENVIRONMENT)
            .or_else(|_| env::var(env_vars::ENVIRONMENT_FALLBACK))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::var(env_vars::CONFIG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}

/// Replace the account key of a connection string with `***`
pub fn redact_connection_string(connection_string: &str) -> String {
    connection_string
        .split(';')
        .map(|segment| match segment.split_once('=') {
            Some((key, _)) if key.trim().eq_ignore_ascii_case("accountkey") => {
                format!("{key}=***")
            }
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}
