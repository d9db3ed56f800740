//! # Configuration Errors
//!
//! Structured errors for configuration loading and validation.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Configuration file not found in {}: {file_name}", .directory.display())]
    FileNotFound { directory: PathBuf, file_name: String },

    #[error("Failed to load configuration: {message}")]
    Load { message: String },

    #[error("Missing required field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn file_not_found(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self::FileNotFound {
            directory: directory.into(),
            file_name: file_name.into(),
        }
    }

    pub fn load(message: impl Into<String>) -> Self {
        Self::Load {
            message: message.into(),
        }
    }

    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        ConfigurationError::load(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
