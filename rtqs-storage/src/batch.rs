//! Classification of multi-write sequences.
//!
//! The record store offers no transaction across records. A sequence of
//! writes that fails part way leaves the earlier writes committed; callers
//! need to tell that apart from a sequence that failed before committing
//! anything.

use rtqs_core::{BatchError, RecordRef, RtqsError, RtqsResult};

/// Tracks how many writes of a planned sequence have committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBatch {
    total: usize,
    committed: usize,
}

impl WriteBatch {
    /// Start a sequence of `total` planned writes.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            committed: 0,
        }
    }

    /// Plan `additional` more writes, e.g. a status write that only becomes
    /// known once the earlier writes have landed.
    pub fn extend(&mut self, additional: usize) {
        self.total += additional;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Record the outcome of one write against `record`.
    ///
    /// Storage failures become [`BatchError::WriteFailure`] when nothing has
    /// committed yet and [`BatchError::PartialBatchFailure`] otherwise. Other
    /// errors pass through unchanged.
    pub fn record<T>(&mut self, record: RecordRef, result: RtqsResult<T>) -> RtqsResult<T> {
        match result {
            Ok(value) => {
                self.committed += 1;
                if self.committed > self.total {
                    self.total = self.committed;
                }
                Ok(value)
            }
            Err(RtqsError::Storage(source)) if self.committed == 0 => {
                Err(BatchError::WriteFailure { record, source }.into())
            }
            Err(RtqsError::Storage(source)) => Err(BatchError::PartialBatchFailure {
                committed: self.committed,
                total: self.total,
                record,
                source,
            }
            .into()),
            Err(other) => Err(other),
        }
    }
}
