//! # Write Error Types
//!
//! Outcome of a bulk write that did not fully succeed. Validation errors are
//! raised before anything is dispatched; the report-carrying variants are
//! raised after every dispatched batch reached a terminal state.

use super::report::WriteReport;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Duplicate row key '{row_key}' in batch {batch_index} of partition '{partition_key}'")]
    DuplicateKey {
        partition_key: String,
        row_key: String,
        batch_index: usize,
    },

    #[error(
        "{} of {} batches failed ({} skipped after cancellation)",
        .report.failed_count(),
        .report.batch_count(),
        .report.skipped_count()
    )]
    BatchesFailed { report: WriteReport },

    #[error(
        "Write cancelled: {} of {} batches skipped",
        .report.skipped_count(),
        .report.batch_count()
    )]
    Cancelled { report: WriteReport },
}

impl WriteError {
    pub fn duplicate_key(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        batch_index: usize,
    ) -> Self {
        Self::DuplicateKey {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            batch_index,
        }
    }

    /// Report of the write, when batches were dispatched
    pub fn report(&self) -> Option<&WriteReport> {
        match self {
            Self::BatchesFailed { report } | Self::Cancelled { report } => Some(report),
            Self::DuplicateKey { .. } => None,
        }
    }

    /// Whether some batches never ran because of cancellation, and none failed
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

pub type WriteResult<T> = Result<T, WriteError>;
