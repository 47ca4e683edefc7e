//! Error types for backlog operations

use crate::EntityType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Reference to a single record in the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub entity_type: EntityType,
    pub id: Uuid,
}

impl RecordRef {
    pub fn new(entity_type: EntityType, id: impl Into<Uuid>) -> Self {
        Self {
            entity_type,
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.entity_type, self.id)
    }
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: Uuid,
        reason: String,
    },

    #[error("Delete failed for {entity_type:?} with id {id}: {reason}")]
    DeleteFailed {
        entity_type: EntityType,
        id: Uuid,
        reason: String,
    },

    #[error("Derived view unavailable: {view}")]
    ViewUnavailable { view: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors. Raised before any write; no state changes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Illegal dimension name '{name}': allowed names are {allowed}")]
    IllegalDimensionName { name: String, allowed: String },

    #[error("Duplicate active dimension: {name}")]
    DuplicateDimension { name: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Malformed number for {field}: '{input}'")]
    MalformedNumber { field: String, input: String },

    #[error("Invalid bucket definitions: {reason}")]
    InvalidBuckets { reason: String },

    #[error("Unknown {entity_type:?} {id}")]
    UnknownRecord { entity_type: EntityType, id: Uuid },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Failures of a sequence of per-record writes.
///
/// Committed writes are never rolled back; the two variants tell the caller
/// whether anything reached the store before the failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("Write failed for {record}: {source}")]
    WriteFailure {
        record: RecordRef,
        source: StorageError,
    },

    #[error(
        "Partial batch failure: {committed} of {total} writes committed before {record} failed: {source}"
    )]
    PartialBatchFailure {
        committed: usize,
        total: usize,
        record: RecordRef,
        source: StorageError,
    },
}

impl BatchError {
    /// The record whose write failed.
    pub fn record(&self) -> RecordRef {
        match self {
            BatchError::WriteFailure { record, .. } => *record,
            BatchError::PartialBatchFailure { record, .. } => *record,
        }
    }

    /// Whether some writes were committed before the failure.
    pub fn is_partial(&self) -> bool {
        matches!(self, BatchError::PartialBatchFailure { .. })
    }
}

/// Master error type for all backlog errors.
#[derive(Debug, Clone, Error)]
pub enum RtqsError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

impl RtqsError {
    /// True for failures of a multi-write sequence that left committed writes behind.
    pub fn is_partial_batch(&self) -> bool {
        matches!(self, RtqsError::Batch(b) if b.is_partial())
    }
}

/// Result type alias for backlog operations.
pub type RtqsResult<T> = Result<T, RtqsError>;

// =============================================================================
// TESTS
// =============================================================================
