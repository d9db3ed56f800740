//! # Messaging Error Types
//!
//! Structured errors for the queue seam and the typed queue built on it.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessagingError {
    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error for {message_id}: {message}")]
    MessageDeserialization { message_id: Uuid, message: String },

    #[error("Invalid dequeue count {count}: must be between 1 and {max}")]
    InvalidDequeueCount { count: usize, max: usize },

    #[error("Invalid visibility timeout of {requested_seconds}s: limit is {max_seconds}s")]
    InvalidVisibilityTimeout {
        requested_seconds: u64,
        max_seconds: u64,
    },

    #[error("Message not found: {queue_name}: {message_id}")]
    MessageNotFound { queue_name: String, message_id: Uuid },

    #[error("Pop receipt mismatch for message {message_id}: the message was dequeued again")]
    PopReceiptMismatch { message_id: Uuid },

    #[error("Internal messaging error: {message}")]
    Internal { message: String },
}

impl MessagingError {
    /// Create a queue not found error
    pub fn queue_not_found(queue_name: impl Into<String>) -> Self {
        Self::QueueNotFound {
            queue_name: queue_name.into(),
        }
    }

    /// Create a message serialization error
    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    /// Create a message deserialization error
    pub fn message_deserialization(message_id: Uuid, message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message_id,
            message: message.into(),
        }
    }

    pub fn message_not_found(queue_name: impl Into<String>, message_id: Uuid) -> Self {
        Self::MessageNotFound {
            queue_name: queue_name.into(),
            message_id,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Serialization failures only; deserialization needs the message id and is
/// mapped where it is known
impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        MessagingError::message_serialization(err.to_string())
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
