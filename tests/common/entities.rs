use serde::{Deserialize, Serialize};
use table_repository::PartitionIdentity;

/// Minimal entity used across the integration tests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestEntity {
    pub partition_key: String,
    pub row_key: String,
    pub payload: String,
}

impl PartitionIdentity for TestEntity {
    fn partition_key(&self) -> &str {
        &self.partition_key
    }
    fn row_key(&self) -> &str {
        &self.row_key
    }
}

pub fn entity(partition_key: &str, row_key: impl ToString) -> TestEntity {
    TestEntity {
        partition_key: partition_key.to_string(),
        row_key: row_key.to_string(),
        payload: format!("payload-{partition_key}"),
    }
}

/// `count` entities in one partition with zero-padded row keys
pub fn partition(partition_key: &str, count: usize) -> Vec<TestEntity> {
    (0..count)
        .map(|i| entity(partition_key, format!("{i:06}")))
        .collect()
}
