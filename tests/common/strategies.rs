use super::entities::TestEntity;
use proptest::prelude::*;

/// Partition keys drawn from a small alphabet so groups get several batches
pub fn partition_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("alpha".to_string()),
        Just("bravo".to_string()),
        Just("charlie".to_string()),
        "[a-z]{1,8}",
    ]
}

/// Entity sets with unique row keys, in arbitrary partition order
pub fn entity_set_strategy(max_len: usize) -> impl Strategy<Value = Vec<TestEntity>> {
    prop::collection::vec(partition_key_strategy(), 0..max_len).prop_map(|keys| {
        keys.into_iter()
            .enumerate()
            .map(|(i, partition_key)| TestEntity {
                partition_key,
                row_key: format!("row-{i:06}"),
                payload: String::new(),
            })
            .collect()
    })
}

/// Concurrency pairs for the writer
pub fn concurrency_strategy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=4, 1usize..=4)
}
