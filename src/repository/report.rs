//! # Batch Outcomes
//!
//! Every planned batch moves through
//! `Pending -> Running -> {Succeeded | Failed | Skipped}`, or straight from
//! `Pending` to `Skipped` when cancellation is observed before it starts.
//! Terminal states are final. [`BatchLedger`] is the one shared, synchronized
//! record of those states during a write; [`WriteReport`] is its snapshot.

use crate::storage::StorageError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Partition key plus the batch's chunk index within that partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId {
    pub partition_key: String,
    pub index: usize,
}

impl BatchId {
    pub fn new(partition_key: impl Into<String>, index: usize) -> Self {
        Self {
            partition_key: partition_key.into(),
            index,
        }
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.partition_key, self.index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchState {
    Pending,
    Running,
    Succeeded,
    Failed(StorageError),
    /// Never dispatched because cancellation was observed first
    Skipped,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_) | Self::Skipped)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub id: BatchId,
    pub entity_count: usize,
    pub state: BatchState,
}

/// Outcome of every batch of one write, in plan order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteReport {
    outcomes: Vec<BatchOutcome>,
    elapsed: Duration,
}

impl WriteReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    pub fn outcome(&self, id: &BatchId) -> Option<&BatchOutcome> {
        self.outcomes.iter().find(|o| &o.id == id)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn batch_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, BatchState::Succeeded))
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, BatchState::Failed(_)))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, BatchState::Skipped))
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    /// Entities in batches that succeeded
    pub fn written_entity_count(&self) -> usize {
        self.succeeded().map(|o| o.entity_count).sum()
    }

    /// Failed batches with the error each one reported
    pub fn failures(&self) -> Vec<(&BatchId, &StorageError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.state {
                BatchState::Failed(err) => Some((&o.id, err)),
                _ => None,
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.state, BatchState::Succeeded))
    }
}

/// Synchronized per-batch state shared by all tasks of one write
#[derive(Debug)]
pub struct BatchLedger {
    slots: HashMap<BatchId, usize>,
    outcomes: Mutex<Vec<BatchOutcome>>,
}

impl BatchLedger {
    /// Register batches in plan order, all `Pending`
    pub fn new(batches: impl IntoIterator<Item = (BatchId, usize)>) -> Self {
        let outcomes: Vec<BatchOutcome> = batches
            .into_iter()
            .map(|(id, entity_count)| BatchOutcome {
                id,
                entity_count,
                state: BatchState::Pending,
            })
            .collect();
        let slots = outcomes
            .iter()
            .enumerate()
            .map(|(slot, o)| (o.id.clone(), slot))
            .collect();

        Self {
            slots,
            outcomes: Mutex::new(outcomes),
        }
    }

    /// `Pending -> Running`; false if the batch was not pending
    pub fn start(&self, id: &BatchId) -> bool {
        self.transition(id, BatchState::Running, |s| matches!(s, BatchState::Pending))
    }

    /// `Running -> Succeeded | Failed`
    pub fn finish(&self, id: &BatchId, result: Result<(), StorageError>) -> bool {
        let state = match result {
            Ok(()) => BatchState::Succeeded,
            Err(err) => BatchState::Failed(err),
        };
        self.transition(id, state, |s| matches!(s, BatchState::Running))
    }

    /// `Pending -> Skipped`
    pub fn skip(&self, id: &BatchId) -> bool {
        self.transition(id, BatchState::Skipped, |s| matches!(s, BatchState::Pending))
    }

    pub fn state(&self, id: &BatchId) -> Option<BatchState> {
        let slot = *self.slots.get(id)?;
        Some(self.outcomes.lock()[slot].state.clone())
    }

    /// Snapshot the ledger. Batches that never reached a terminal state are
    /// reported as failed so that no outcome is dropped.
    pub fn report(&self, elapsed: Duration) -> WriteReport {
        let outcomes = self
            .outcomes
            .lock()
            .iter()
            .cloned()
            .map(|mut outcome| {
                if !outcome.state.is_terminal() {
                    warn!(batch = %outcome.id, state = outcome.state.name(), "Batch did not reach a terminal state");
                    outcome.state = BatchState::Failed(StorageError::interrupted(format!(
                        "batch task ended while {}",
                        outcome.state.name()
                    )));
                }
                outcome
            })
            .collect();

        WriteReport { outcomes, elapsed }
    }

    fn transition(
        &self,
        id: &BatchId,
        next: BatchState,
        allowed_from: impl Fn(&BatchState) -> bool,
    ) -> bool {
        let Some(&slot) = self.slots.get(id) else {
            warn!(batch = %id, "Transition requested for unknown batch");
            return false;
        };
        let mut outcomes = self.outcomes.lock();
        let current = &mut outcomes[slot].state;
        if !allowed_from(current) {
            warn!(
                batch = %id,
                from = current.name(),
                to = next.name(),
                "Rejected batch state transition"
            );
            return false;
        }
        *current = next;
        true
    }
}
