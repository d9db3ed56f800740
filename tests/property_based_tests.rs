mod common;

use common::strategies::*;
use common::*;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use table_repository::repository::BatchPlan;
use table_repository::{
    InMemoryTableClient, ParallelismPolicy, PartitionedBatchWriter, RequestOptions, TableClient,
    MAX_BATCH_SIZE,
};

proptest! {
    /// Property: every entity lands in exactly one batch, in input order within its partition
    #[test]
    fn plan_covers_every_entity_exactly_once(entities in entity_set_strategy(400)) {
        let plan = BatchPlan::build(entities.clone()).unwrap();

        let planned: Vec<TestEntity> = plan
            .groups()
            .iter()
            .flat_map(|g| g.batches.iter().flat_map(|b| b.entities.iter().cloned()))
            .collect();
        prop_assert_eq!(planned.len(), entities.len());

        for group in plan.groups() {
            let expected: Vec<&TestEntity> = entities
                .iter()
                .filter(|e| e.partition_key == group.partition_key)
                .collect();
            let actual: Vec<&TestEntity> = group
                .batches
                .iter()
                .flat_map(|b| b.entities.iter())
                .collect();
            prop_assert_eq!(actual, expected);
        }
    }

    /// Property: a partition of N entities yields ceil(N / 100) batches, all full but the last
    #[test]
    fn batches_are_full_except_the_last(entities in entity_set_strategy(600)) {
        let plan = BatchPlan::build(entities).unwrap();

        for group in plan.groups() {
            let n = group.entity_count();
            prop_assert_eq!(group.batches.len(), n.div_ceil(MAX_BATCH_SIZE));
            let (last, leading) = group.batches.split_last().unwrap();
            prop_assert!(leading.iter().all(|b| b.entities.len() == MAX_BATCH_SIZE));
            prop_assert!(!last.entities.is_empty() && last.entities.len() <= MAX_BATCH_SIZE);
            for (index, batch) in group.batches.iter().enumerate() {
                prop_assert_eq!(batch.id.index, index);
            }
        }
    }

    /// Property: no batch spans two partition keys, and groups follow first appearance
    #[test]
    fn batches_stay_within_one_partition(entities in entity_set_strategy(300)) {
        let plan = BatchPlan::build(entities.clone()).unwrap();

        for group in plan.groups() {
            for batch in &group.batches {
                prop_assert!(batch.entities.iter().all(|e| e.partition_key == group.partition_key));
                prop_assert_eq!(&batch.id.partition_key, &group.partition_key);
            }
        }

        let mut first_seen: Vec<&str> = Vec::new();
        for entity in &entities {
            if !first_seen.contains(&entity.partition_key.as_str()) {
                first_seen.push(&entity.partition_key);
            }
        }
        let group_order: Vec<&str> = plan.groups().iter().map(|g| g.partition_key.as_str()).collect();
        prop_assert_eq!(group_order, first_seen);
    }

    /// Property: any valid policy stores exactly the written entities
    #[test]
    fn every_policy_writes_every_entity(
        entities in entity_set_strategy(450),
        (partition_concurrency, batch_concurrency) in concurrency_strategy(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let (report, stored) = runtime.block_on(async {
            let client = Arc::new(InMemoryTableClient::new());
            TableClient::<TestEntity>::create_if_not_exists(client.as_ref(), "entities").await.unwrap();
            let writer: PartitionedBatchWriter<TestEntity, _> =
                PartitionedBatchWriter::new(Arc::clone(&client), "entities", RequestOptions::default());
            let policy = ParallelismPolicy::new(partition_concurrency, batch_concurrency).unwrap();
            let report = writer.write_all(entities.clone(), &policy).await.unwrap();
            (report, client.entity_count("entities"))
        });

        let mut per_partition: HashMap<&str, usize> = HashMap::new();
        for entity in &entities {
            *per_partition.entry(entity.partition_key.as_str()).or_default() += 1;
        }
        let expected_batches: usize = per_partition.values().map(|n| n.div_ceil(MAX_BATCH_SIZE)).sum();

        prop_assert_eq!(report.batch_count(), expected_batches);
        prop_assert_eq!(report.written_entity_count(), entities.len());
        prop_assert_eq!(stored, Some(entities.len()));
    }
}
