//! # In-Memory Queue Client
//!
//! In-process [`QueueClient`] with the service's delivery semantics: FIFO
//! among visible messages, per-dequeue visibility timeouts, and a fresh pop
//! receipt on every dequeue that invalidates earlier ones. Visibility uses
//! `tokio::time`, so tests can drive it with a paused clock.

use super::client::QueueClient;
use super::errors::{MessagingError, MessagingResult};
use super::message::{MessageHandle, RawMessage};
use crate::constants::queue::{MAX_DEQUEUE_COUNT, MAX_VISIBILITY_TIMEOUT};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
struct StoredMessage {
    id: Uuid,
    payload: String,
    inserted_at: DateTime<Utc>,
    dequeue_count: u32,
    pop_receipt: Option<String>,
    visible_at: Instant,
}

#[derive(Debug, Default)]
pub struct InMemoryQueueClient {
    queues: Mutex<HashMap<String, VecDeque<StoredMessage>>>,
}

impl InMemoryQueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in `queue`, visible or not; `None` if the queue does not exist
    pub fn message_count(&self, queue: &str) -> Option<usize> {
        self.queues.lock().get(queue).map(VecDeque::len)
    }

    fn validate_dequeue(count: usize, visibility_timeout: Duration) -> MessagingResult<()> {
        if count == 0 || count > MAX_DEQUEUE_COUNT {
            return Err(MessagingError::InvalidDequeueCount {
                count,
                max: MAX_DEQUEUE_COUNT,
            });
        }
        if visibility_timeout > MAX_VISIBILITY_TIMEOUT {
            return Err(MessagingError::InvalidVisibilityTimeout {
                requested_seconds: visibility_timeout.as_secs(),
                max_seconds: MAX_VISIBILITY_TIMEOUT.as_secs(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn create_if_not_exists(&self, queue: &str) -> MessagingResult<bool> {
        let mut queues = self.queues.lock();
        if queues.contains_key(queue) {
            return Ok(false);
        }
        queues.insert(queue.to_string(), VecDeque::new());
        debug!(queue = %queue, "Created in-memory queue");
        Ok(true)
    }

    async fn enqueue(&self, queue: &str, payload: String) -> MessagingResult<MessageHandle> {
        let mut queues = self.queues.lock();
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| MessagingError::queue_not_found(queue))?;

        let message = StoredMessage {
            id: Uuid::new_v4(),
            payload,
            inserted_at: Utc::now(),
            dequeue_count: 0,
            pop_receipt: None,
            visible_at: Instant::now(),
        };
        let handle = MessageHandle {
            message_id: message.id,
            pop_receipt: String::new(),
            dequeue_count: 0,
            inserted_at: message.inserted_at,
            next_visible_at: message.inserted_at,
        };
        messages.push_back(message);
        Ok(handle)
    }

    async fn dequeue(
        &self,
        queue: &str,
        count: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<RawMessage>> {
        Self::validate_dequeue(count, visibility_timeout)?;
        let hidden_for = chrono::Duration::from_std(visibility_timeout)
            .map_err(|e| MessagingError::internal(e.to_string()))?;

        let mut queues = self.queues.lock();
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| MessagingError::queue_not_found(queue))?;

        let now = Instant::now();
        let next_visible_at = Utc::now() + hidden_for;
        let delivered = messages
            .iter_mut()
            .filter(|m| m.visible_at <= now)
            .take(count)
            .map(|message| {
                let pop_receipt = Uuid::new_v4().to_string();
                message.dequeue_count += 1;
                message.pop_receipt = Some(pop_receipt.clone());
                message.visible_at = now + visibility_timeout;
                RawMessage {
                    payload: message.payload.clone(),
                    handle: MessageHandle {
                        message_id: message.id,
                        pop_receipt,
                        dequeue_count: message.dequeue_count,
                        inserted_at: message.inserted_at,
                        next_visible_at,
                    },
                }
            })
            .collect();
        Ok(delivered)
    }

    async fn delete(&self, queue: &str, handle: &MessageHandle) -> MessagingResult<()> {
        let mut queues = self.queues.lock();
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| MessagingError::queue_not_found(queue))?;

        let position = messages
            .iter()
            .position(|m| m.id == handle.message_id)
            .ok_or_else(|| MessagingError::message_not_found(queue, handle.message_id))?;

        if messages[position].pop_receipt.as_deref() != Some(handle.pop_receipt.as_str()) {
            return Err(MessagingError::PopReceiptMismatch {
                message_id: handle.message_id,
            });
        }
        messages.remove(position);
        Ok(())
    }
}
