//! # Queue Messages
//!
//! A queued message's payload and its handle travel separately: the payload
//! is the caller's type, serialized as JSON, and the [`MessageHandle`] is the
//! service-assigned metadata needed to delete it. The handle never becomes
//! part of the payload.

use super::errors::MessagingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Service-assigned identity and receipt of one dequeued or enqueued message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    pub message_id: Uuid,
    /// Receipt of the latest dequeue; required to delete the message
    pub pop_receipt: String,
    pub dequeue_count: u32,
    pub inserted_at: DateTime<Utc>,
    /// When the message becomes visible to other consumers again
    pub next_visible_at: DateTime<Utc>,
}

/// Payload text plus handle, as returned by a [`QueueClient`](super::QueueClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub payload: String,
    pub handle: MessageHandle,
}

/// Deserialized payload plus the handle that identifies its delivery
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage<M> {
    pub payload: M,
    pub handle: MessageHandle,
}

impl<M> QueueMessage<M> {
    pub fn message_id(&self) -> Uuid {
        self.handle.message_id
    }

    pub fn dequeue_count(&self) -> u32 {
        self.handle.dequeue_count
    }

    pub fn into_payload(self) -> M {
        self.payload
    }
}

/// A delivered message whose payload could not be decoded into the queue's
/// type. It stays hidden until its visibility timeout expires unless it is
/// deleted through its handle.
#[derive(Debug, Clone, PartialEq)]
pub struct UndecodableMessage {
    pub raw: RawMessage,
    pub error: MessagingError,
}

impl UndecodableMessage {
    pub fn message_id(&self) -> Uuid {
        self.raw.handle.message_id
    }
}

/// Result of one dequeue: the decoded messages in delivery order, plus the
/// ones whose payload did not decode
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessages<M> {
    pub messages: Vec<QueueMessage<M>>,
    pub undecodable: Vec<UndecodableMessage>,
}

impl<M> ReceivedMessages<M> {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_undecodable(&self) -> bool {
        !self.undecodable.is_empty()
    }

    pub fn into_messages(self) -> Vec<QueueMessage<M>> {
        self.messages
    }
}

impl<M> IntoIterator for ReceivedMessages<M> {
    type Item = QueueMessage<M>;
    type IntoIter = std::vec::IntoIter<QueueMessage<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}
