//! # Storage Error Types
//!
//! Failures reported by a [`TableClient`](super::TableClient). The repository
//! treats them as opaque and passes them through with the identity of the
//! entity or batch they concern attached.

use super::entity::EntityKey;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    #[error("Entity already exists: {key}")]
    Conflict { key: EntityKey },

    #[error("Entity not found: {key}")]
    NotFound { key: EntityKey },

    #[error("Invalid batch: {reason}")]
    InvalidBatch { reason: String },

    #[error("Request throttled by the table service")]
    Throttled,

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Entity serialization error: {message}")]
    Serialization { message: String },

    #[error("Operation interrupted before completion: {message}")]
    Interrupted { message: String },
}

impl StorageError {
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    pub fn invalid_batch(reason: impl Into<String>) -> Self {
        Self::InvalidBatch {
            reason: reason.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
