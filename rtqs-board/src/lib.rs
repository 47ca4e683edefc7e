//! RTQS Board - Coefficient Registry and Staging/Confirmation Store
//!
//! Session layer between the dashboard and a [`rtqs_storage::RecordStore`].
//! Boards hold the last authoritative snapshot loaded from the store plus a
//! set of unconfirmed edits. Displays read through the edits; ranking reads
//! only the snapshot. A confirm writes the edits, reloads, and clears them
//! only when every write landed.

pub mod epics;
pub mod registry;
pub mod staging;
pub mod tasks;

use serde::{Deserialize, Serialize};

pub use epics::{EpicBoard, EpicDisplay, EpicSnapshot};
pub use registry::{CoefficientRegistry, DimensionInput};
pub use staging::{
    ConfirmOutcome, EpicEdit, EpicField, FieldEdit, FlushSet, PendingEdits, StageState,
    StoryEdit, StoryField, TaskEdit, TaskField,
};
pub use tasks::{TaskBoard, TaskDisplay, TaskSnapshot};

/// Where the computed columns of the current snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewSource {
    /// The store's derived view
    #[default]
    Store,
    /// Derived in process because the store's view was unavailable
    Local,
}
