//! # Entity Identity
//!
//! Entities are opaque to the repository except for the two keys that place
//! them in the table: the partition key (consistency and locality group) and
//! the row key (unique within a partition).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability implemented by anything that can be stored in a partitioned table
pub trait PartitionIdentity {
    fn partition_key(&self) -> &str;
    fn row_key(&self) -> &str;

    /// Owned copy of both keys
    fn entity_key(&self) -> EntityKey {
        EntityKey::new(self.partition_key(), self.row_key())
    }
}

/// Everything the repository needs from an entity type.
///
/// Blanket-implemented; entity types only implement [`PartitionIdentity`]
/// and derive the serde traits.
pub trait TableEntity:
    PartitionIdentity + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
}

impl<T> TableEntity for T where
    T: PartitionIdentity + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
}

/// `(PartitionKey, RowKey)` pair, ordered the way the service orders entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub partition_key: String,
    pub row_key: String,
}

impl EntityKey {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.partition_key, self.row_key)
    }
}
