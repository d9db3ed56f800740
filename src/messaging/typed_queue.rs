//! # Typed Queue
//!
//! A queue whose messages are values of one type `M`, stored as JSON text.
//! Dequeued messages come back as [`QueueMessage<M>`], pairing the payload
//! with the handle needed to delete it.

use super::client::QueueClient;
use super::errors::MessagingError;
use super::message::{
    MessageHandle, QueueMessage, RawMessage, ReceivedMessages, UndecodableMessage,
};
use crate::config::RepositoryConfig;
use crate::connection::StorageAccount;
use crate::error::Result;
use crate::logging::log_queue_operation;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct TypedQueue<M, C> {
    client: Arc<C>,
    queue_name: String,
    account: StorageAccount,
    default_visibility_timeout: Duration,
    _message: PhantomData<fn() -> M>,
}

impl<M, C> std::fmt::Debug for TypedQueue<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedQueue")
            .field("queue_name", &self.queue_name)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl<M, C> TypedQueue<M, C>
where
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
    C: QueueClient,
{
    /// Parse the connection string and make sure the queue exists
    pub async fn connect(
        connection_string: &str,
        queue_name: impl Into<String>,
        client: Arc<C>,
    ) -> Result<Self> {
        let account = StorageAccount::parse(connection_string)?;
        let queue_name = queue_name.into();
        let created = client.create_if_not_exists(&queue_name).await?;

        info!(
            queue = %queue_name,
            endpoint = %account.queue_endpoint(),
            created,
            "📬 Connected to queue"
        );

        Ok(Self {
            client,
            queue_name,
            account,
            default_visibility_timeout: crate::constants::queue::DEFAULT_VISIBILITY_TIMEOUT,
            _message: PhantomData,
        })
    }

    /// Connect using the queue section of the configuration
    pub async fn from_config(config: &RepositoryConfig, client: Arc<C>) -> Result<Self> {
        let mut queue = Self::connect(
            config.queue_connection_string(),
            config.queue.queue_name.clone(),
            client,
        )
        .await?;
        queue.default_visibility_timeout = config.queue.visibility_timeout();
        Ok(queue)
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn account(&self) -> &StorageAccount {
        &self.account
    }

    pub fn default_visibility_timeout(&self) -> Duration {
        self.default_visibility_timeout
    }

    pub async fn add_message(&self, message: &M) -> Result<MessageHandle> {
        let payload = serde_json::to_string(message).map_err(MessagingError::from)?;
        let size = payload.len();
        let handle = self.client.enqueue(&self.queue_name, payload).await?;
        log_queue_operation("add_message", &self.queue_name, Some(handle.message_id), size);
        Ok(handle)
    }

    /// Next visible message, hidden from other consumers for `visibility_timeout`.
    ///
    /// A payload that does not decode is reported as
    /// [`MessagingError::MessageDeserialization`]. Use
    /// [`get_messages`](Self::get_messages) to receive such a message with its
    /// handle.
    pub async fn get_message(&self, visibility_timeout: Duration) -> Result<Option<QueueMessage<M>>> {
        let received = self.get_messages(1, visibility_timeout).await?;
        if let Some(undecodable) = received.undecodable.into_iter().next() {
            return Err(undecodable.error.into());
        }
        Ok(received.messages.into_iter().next())
    }

    /// [`get_message`](Self::get_message) with the queue's default visibility timeout
    pub async fn next_message(&self) -> Result<Option<QueueMessage<M>>> {
        self.get_message(self.default_visibility_timeout).await
    }

    /// Dequeue up to `count` messages.
    ///
    /// Messages whose payload does not decode are returned separately so the
    /// rest of the delivery is never lost with them.
    pub async fn get_messages(
        &self,
        count: usize,
        visibility_timeout: Duration,
    ) -> Result<ReceivedMessages<M>> {
        let raw = self
            .client
            .dequeue(&self.queue_name, count, visibility_timeout)
            .await?;

        let mut received = ReceivedMessages {
            messages: Vec::with_capacity(raw.len()),
            undecodable: Vec::new(),
        };
        for message in raw {
            match self.decode(&message) {
                Ok(payload) => received.messages.push(QueueMessage {
                    payload,
                    handle: message.handle,
                }),
                Err(error) => received
                    .undecodable
                    .push(UndecodableMessage { raw: message, error }),
            }
        }
        Ok(received)
    }

    /// [`get_messages`](Self::get_messages) with the queue's default visibility timeout
    pub async fn next_messages(&self, count: usize) -> Result<ReceivedMessages<M>> {
        self.get_messages(count, self.default_visibility_timeout)
            .await
    }

    /// Delete a message received from [`get_message`](Self::get_message)
    pub async fn delete_message(&self, message: &QueueMessage<M>) -> Result<()> {
        self.client.delete(&self.queue_name, &message.handle).await?;
        log_queue_operation("delete_message", &self.queue_name, Some(message.message_id()), 0);
        Ok(())
    }

    /// Remove a message whose payload could not be decoded
    pub async fn delete_undecodable(&self, message: &UndecodableMessage) -> Result<()> {
        self.client.delete(&self.queue_name, &message.raw.handle).await?;
        log_queue_operation(
            "delete_undecodable",
            &self.queue_name,
            Some(message.message_id()),
            message.raw.payload.len(),
        );
        Ok(())
    }

    fn decode(&self, message: &RawMessage) -> std::result::Result<M, MessagingError> {
        serde_json::from_str(&message.payload).map_err(|err| {
            warn!(
                queue = %self.queue_name,
                message_id = %message.handle.message_id,
                error = %err,
                "Failed to deserialize queue message"
            );
            MessagingError::message_deserialization(message.handle.message_id, err.to_string())
        })
    }
}
