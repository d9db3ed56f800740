//! # Queue Client Seam
//!
//! The operations the typed queue consumes from the external queue service.

use super::errors::MessagingResult;
use super::message::{MessageHandle, RawMessage};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait QueueClient: Send + Sync + 'static {
    /// Create the queue; returns `true` when it did not exist before
    async fn create_if_not_exists(&self, queue: &str) -> MessagingResult<bool>;

    /// Append a message; the returned handle has no pop receipt until dequeued
    async fn enqueue(&self, queue: &str, payload: String) -> MessagingResult<MessageHandle>;

    /// Take up to `count` visible messages and hide them for `visibility_timeout`
    async fn dequeue(
        &self,
        queue: &str,
        count: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<RawMessage>>;

    /// Delete a message; the handle's pop receipt must match its latest dequeue
    async fn delete(&self, queue: &str, handle: &MessageHandle) -> MessagingResult<()>;
}
