//! Typed Queue Integration Tests

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use table_repository::{
    InMemoryQueueClient, MessagingError, QueueClient, RepositoryError, TypedQueue,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OrderPlaced {
    order_id: u64,
    lines: Vec<String>,
}

fn order(order_id: u64) -> OrderPlaced {
    OrderPlaced {
        order_id,
        lines: vec![format!("sku-{order_id}")],
    }
}

async fn orders_queue(
    client: &Arc<InMemoryQueueClient>,
) -> TypedQueue<OrderPlaced, InMemoryQueueClient> {
    TypedQueue::connect("UseDevelopmentStorage=true", "orders", Arc::clone(client))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_payload_is_plain_json_without_handle() {
    let client = Arc::new(InMemoryQueueClient::new());
    let queue = orders_queue(&client).await;
    queue.add_message(&order(1)).await.unwrap();

    let raw = client
        .dequeue("orders", 1, Duration::from_secs(5))
        .await
        .unwrap()
        .remove(0);
    let json: serde_json::Value = serde_json::from_str(&raw.payload).unwrap();
    assert_eq!(json, serde_json::json!({ "order_id": 1, "lines": ["sku-1"] }));
}

#[tokio::test]
async fn test_messages_are_delivered_in_order_in_batches() {
    let client = Arc::new(InMemoryQueueClient::new());
    let queue = orders_queue(&client).await;
    for id in 0..40 {
        queue.add_message(&order(id)).await.unwrap();
    }

    let first = queue.get_messages(32, Duration::from_secs(30)).await.unwrap();
    let second = queue.get_messages(32, Duration::from_secs(30)).await.unwrap();

    let ids: Vec<u64> = first
        .messages
        .iter()
        .chain(&second.messages)
        .map(|m| m.payload.order_id)
        .collect();
    assert_eq!(ids, (0..40).collect::<Vec<_>>());
    assert_eq!(second.len(), 8);
    assert!(!first.has_undecodable());

    let err = queue
        .get_messages(33, Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Messaging(MessagingError::InvalidDequeueCount { count: 33, max: 32 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_undeleted_message_reappears_after_visibility_timeout() {
    let client = Arc::new(InMemoryQueueClient::new());
    let queue = orders_queue(&client).await;
    queue.add_message(&order(9)).await.unwrap();

    let first = queue
        .get_message(Duration::from_secs(30))
        .await
        .unwrap()
        .unwrap();
    assert!(queue
        .get_message(Duration::from_secs(30))
        .await
        .unwrap()
        .is_none());

    tokio::time::advance(Duration::from_secs(30)).await;

    let redelivered = queue
        .get_message(Duration::from_secs(30))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(redelivered.payload, first.payload);
    assert_eq!(redelivered.message_id(), first.message_id());
    assert_eq!(redelivered.dequeue_count(), 2);

    // The first receipt is stale once the message has been dequeued again
    let err = queue.delete_message(&first).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Messaging(MessagingError::PopReceiptMismatch { .. })
    ));
    queue.delete_message(&redelivered).await.unwrap();
    assert_eq!(client.message_count("orders"), Some(0));
}

#[tokio::test]
async fn test_deleting_twice_reports_missing_message() {
    let client = Arc::new(InMemoryQueueClient::new());
    let queue = orders_queue(&client).await;
    queue.add_message(&order(3)).await.unwrap();

    let message = queue
        .get_message(Duration::from_secs(30))
        .await
        .unwrap()
        .unwrap();
    queue.delete_message(&message).await.unwrap();

    let err = queue.delete_message(&message).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Messaging(MessagingError::MessageNotFound { .. })
    ));
}

#[tokio::test]
async fn test_connect_rejects_malformed_connection_string() {
    let result: Result<TypedQueue<OrderPlaced, _>, _> = TypedQueue::connect(
        "AccountName",
        "orders",
        Arc::new(InMemoryQueueClient::new()),
    )
    .await;
    assert!(matches!(result, Err(RepositoryError::Connection(_))));
}
