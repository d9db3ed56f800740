//! # Messaging Module
//!
//! Strongly typed queue messaging over an external queue service.
//! Payloads are JSON; the service's handle travels beside the payload in
//! [`QueueMessage`], never inside it.

pub mod client;
pub mod errors;
pub mod memory;
pub mod message;
pub mod typed_queue;

pub use client::QueueClient;
pub use errors::{MessagingError, MessagingResult};
pub use memory::InMemoryQueueClient;
pub use message::{
    MessageHandle, QueueMessage, RawMessage, ReceivedMessages, UndecodableMessage,
};
pub use typed_queue::TypedQueue;
