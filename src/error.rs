//! # Repository Error Types
//!
//! Top-level error returned by [`TableRepository`](crate::repository::TableRepository)
//! and [`TypedQueue`](crate::messaging::TypedQueue). Module-level errors convert
//! into it with `?`.

use crate::config::ConfigurationError;
use crate::connection::ConnectionStringError;
use crate::messaging::MessagingError;
use crate::repository::WriteError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Connection(#[from] ConnectionStringError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Batch of {size} entities exceeds the limit of {limit}")]
    BatchSize { size: usize, limit: usize },

    #[error("Remote {operation} failed{}: {source}", describe_key(.partition_key, .row_key))]
    RemoteOperation {
        operation: &'static str,
        partition_key: Option<String>,
        row_key: Option<String>,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

fn describe_key(partition_key: &Option<String>, row_key: &Option<String>) -> String {
    match (partition_key, row_key) {
        (Some(pk), Some(rk)) => format!(" for ({pk}, {rk})"),
        (Some(pk), None) => format!(" for partition '{pk}'"),
        _ => String::new(),
    }
}

impl RepositoryError {
    /// Wrap a storage failure with the identity of the entity it concerns
    pub fn remote(
        operation: &'static str,
        partition_key: Option<&str>,
        row_key: Option<&str>,
        source: StorageError,
    ) -> Self {
        Self::RemoteOperation {
            operation,
            partition_key: partition_key.map(str::to_owned),
            row_key: row_key.map(str::to_owned),
            source,
        }
    }

    pub fn batch_size(size: usize, limit: usize) -> Self {
        Self::BatchSize { size, limit }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display_includes_entity_identity() {
        let err = RepositoryError::remote(
            "insert_or_replace",
            Some("P1"),
            Some("R7"),
            StorageError::transport("connection reset"),
        );
        let display = err.to_string();
        assert!(display.contains("insert_or_replace"));
        assert!(display.contains("(P1, R7)"));
        assert!(display.contains("connection reset"));
    }

    #[test]
    fn test_remote_error_without_keys() {
        let err = RepositoryError::remote(
            "create_if_not_exists",
            None,
            None,
            StorageError::Throttled,
        );
        assert!(!err.to_string().contains(" for "));
    }

    #[test]
    fn test_batch_size_display() {
        let err = RepositoryError::batch_size(101, 100);
        assert_eq!(err.to_string(), "Batch of 101 entities exceeds the limit of 100");
    }
}
