//! RTQS Storage - Record Store Trait and Mock Implementation
//!
//! Defines the boundary to the external record store holding dimensions,
//! epics, stories, tasks and task scores. The store is the source of truth;
//! everything above it reloads after each mutation.

pub mod batch;
pub mod mock;
pub mod store;

pub use batch::WriteBatch;
pub use mock::{FailurePoint, MockRecordStore, WriteOp};
pub use store::{RecordStore, EPIC_PRIORITY_VIEW, TASK_PRIORITY_VIEW};

use rtqs_core::{EpicId, EpicStatus, Score, StoryPoints, StoryStatus};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for dimensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionUpdate {
    /// Canonical name
    pub name: Option<String>,
    pub coefficient: Option<f64>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Update payload for epics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpicUpdate {
    pub title: Option<String>,
    /// `Some(None)` clears the link
    pub link: Option<Option<String>>,
    pub r: Option<Score>,
    pub t: Option<Score>,
    pub q: Option<Score>,
    pub s: Option<Score>,
    pub status: Option<EpicStatus>,
    pub is_confirmed: Option<bool>,
}

impl EpicUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Update payload for stories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryUpdate {
    pub title: Option<String>,
    pub link: Option<Option<String>>,
    pub points: Option<StoryPoints>,
    pub gate: Option<bool>,
    pub order_index: Option<i32>,
    pub status: Option<StoryStatus>,
}

impl StoryUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Update payload for tasks. Scores are written through
/// [`RecordStore::task_score_upsert`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub link: Option<Option<String>>,
    pub points: Option<StoryPoints>,
    pub gate: Option<bool>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Read filter for dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimensionFilter {
    /// Only return active dimensions
    pub active_only: bool,
}

impl DimensionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn active() -> Self {
        Self { active_only: true }
    }
}

/// Read filter for stories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoryFilter {
    pub epic_id: Option<EpicId>,
    pub status: Option<StoryStatus>,
}

impl StoryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_epic(epic_id: EpicId) -> Self {
        Self {
            epic_id: Some(epic_id),
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_updates() {
        assert!(EpicUpdate::default().is_empty());
        assert!(StoryUpdate::default().is_empty());
        assert!(TaskUpdate::default().is_empty());

        let update = EpicUpdate {
            link: Some(None),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_filters() {
        assert!(!DimensionFilter::all().active_only);
        assert!(DimensionFilter::active().active_only);
        let epic_id = EpicId::now_v7();
        let filter = StoryFilter::for_epic(epic_id);
        assert_eq!(filter.epic_id, Some(epic_id));
        assert_eq!(filter.status, None);
    }
}
