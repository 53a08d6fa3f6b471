//! Batch and table load outcomes

use serde::{Deserialize, Serialize};

/// Result of loading one staged batch inside one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every row was inserted and the transaction committed
    Loaded {
        /// Rows committed
        rows: usize,
    },
    /// Nothing from the batch is visible in the warehouse
    Failed {
        /// Zero-based row that failed to insert, `None` when the batch failed as a whole
        row_index: Option<usize>,
        /// What went wrong
        reason: String,
    },
}

impl BatchOutcome {
    /// Failure not tied to a particular row
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            row_index: None,
            reason: reason.into(),
        }
    }

    /// Whether the batch committed
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// A batch reported back to the caller as failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBatch {
    /// Warehouse table
    pub table: String,
    /// Transformed batch key
    pub key: String,
    /// Row that failed, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
    /// Failure reason
    pub reason: String,
}

/// Per-table tally across its batches
#[derive(Debug, Clone, Default)]
pub struct TableLoad {
    /// Rows committed
    pub rows: usize,
    /// Batches committed
    pub loaded_batches: usize,
    /// Batches rolled back or rejected
    pub failed_batches: usize,
}

impl TableLoad {
    /// Records one batch outcome
    pub fn add(&mut self, outcome: &BatchOutcome) {
        match outcome {
            BatchOutcome::Loaded { rows } => {
                self.rows += rows;
                self.loaded_batches += 1;
            }
            BatchOutcome::Failed { .. } => self.failed_batches += 1,
        }
    }

    /// Every batch of the table committed
    pub fn fully_loaded(&self) -> bool {
        self.failed_batches == 0 && self.loaded_batches > 0
    }
}
