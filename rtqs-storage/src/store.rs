//! The async record store boundary.

use crate::{
    DimensionFilter, DimensionUpdate, EpicUpdate, StoryFilter, StoryUpdate, TaskUpdate, WriteBatch,
};
use ::async_trait::async_trait;
use rtqs_core::{
    Dimension, DimensionId, EntityType, Epic, EpicId, EpicPriorityView, RecordRef, RtqsResult,
    StorageError, Story, StoryId, Task, TaskId, TaskPriorityView, TaskScore,
};

/// Name of the derived epic view.
pub const EPIC_PRIORITY_VIEW: &str = "epic_priorities";
/// Name of the derived task view.
pub const TASK_PRIORITY_VIEW: &str = "task_priorities";

/// Persistence for the dashboard's record collections.
///
/// Every write is an independent request; nothing here spans records
/// transactionally unless an implementation overrides the `*_swap_order`
/// defaults with something stronger.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ========================================================================
    // DIMENSION OPERATIONS
    // ========================================================================

    /// List dimensions ordered by `(sort_order, created_at)`.
    async fn dimension_list(&self, filter: DimensionFilter) -> RtqsResult<Vec<Dimension>>;

    async fn dimension_insert(&self, d: &Dimension) -> RtqsResult<()>;

    async fn dimension_update(&self, id: DimensionId, update: DimensionUpdate) -> RtqsResult<()>;

    /// Delete a dimension and every task score recorded against it.
    async fn dimension_delete(&self, id: DimensionId) -> RtqsResult<()>;

    /// Exchange the `sort_order` of two dimensions.
    ///
    /// Two separate writes. If the second fails the first stays committed and
    /// the pair briefly shares a position; the error is a
    /// `PartialBatchFailure` so the caller can reload and retry.
    async fn dimension_swap_order(&self, a: &Dimension, b: &Dimension) -> RtqsResult<()> {
        let mut batch = WriteBatch::new(2);
        batch.record(
            RecordRef::new(EntityType::Dimension, a.dimension_id),
            self.dimension_update(
                a.dimension_id,
                DimensionUpdate {
                    sort_order: Some(b.sort_order),
                    ..Default::default()
                },
            )
            .await,
        )?;
        batch
            .record(
                RecordRef::new(EntityType::Dimension, b.dimension_id),
                self.dimension_update(
                    b.dimension_id,
                    DimensionUpdate {
                        sort_order: Some(a.sort_order),
                        ..Default::default()
                    },
                )
                .await,
            )
            .inspect_err(|e| {
                tracing::warn!(
                    dimension_id = %b.dimension_id,
                    error = %e,
                    "Dimension swap left half-applied"
                )
            })?;
        Ok(())
    }

    // ========================================================================
    // EPIC OPERATIONS
    // ========================================================================

    /// List all epics ordered by `created_at`.
    async fn epic_list(&self) -> RtqsResult<Vec<Epic>>;

    async fn epic_get(&self, id: EpicId) -> RtqsResult<Option<Epic>>;

    async fn epic_insert(&self, e: &Epic) -> RtqsResult<()>;

    /// Apply an update and bump `updated_at`.
    async fn epic_update(&self, id: EpicId, update: EpicUpdate) -> RtqsResult<()>;

    /// Delete an epic together with its stories.
    async fn epic_delete(&self, id: EpicId) -> RtqsResult<()>;

    /// The store-computed epic view. Stores without one report
    /// [`StorageError::ViewUnavailable`] and callers derive it locally.
    async fn epic_priority_view(&self) -> RtqsResult<Vec<EpicPriorityView>> {
        Err(StorageError::ViewUnavailable {
            view: EPIC_PRIORITY_VIEW.to_string(),
        }
        .into())
    }

    // ========================================================================
    // STORY OPERATIONS
    // ========================================================================

    /// List stories ordered by `(epic_id, order_index)`.
    async fn story_list(&self, filter: StoryFilter) -> RtqsResult<Vec<Story>>;

    async fn story_insert(&self, s: &Story) -> RtqsResult<()>;

    async fn story_update(&self, id: StoryId, update: StoryUpdate) -> RtqsResult<()>;

    async fn story_delete(&self, id: StoryId) -> RtqsResult<()>;

    /// Exchange the `order_index` of two sibling stories. Same two-write
    /// behaviour as [`RecordStore::dimension_swap_order`].
    async fn story_swap_order(&self, a: &Story, b: &Story) -> RtqsResult<()> {
        let mut batch = WriteBatch::new(2);
        batch.record(
            RecordRef::new(EntityType::Story, a.story_id),
            self.story_update(
                a.story_id,
                StoryUpdate {
                    order_index: Some(b.order_index),
                    ..Default::default()
                },
            )
            .await,
        )?;
        batch
            .record(
                RecordRef::new(EntityType::Story, b.story_id),
                self.story_update(
                    b.story_id,
                    StoryUpdate {
                        order_index: Some(a.order_index),
                        ..Default::default()
                    },
                )
                .await,
            )
            .inspect_err(|e| {
                tracing::warn!(
                    story_id = %b.story_id,
                    epic_id = %b.epic_id,
                    error = %e,
                    "Story swap left half-applied"
                )
            })?;
        Ok(())
    }

    // ========================================================================
    // TASK OPERATIONS
    // ========================================================================

    /// List all tasks ordered by `created_at`.
    async fn task_list(&self) -> RtqsResult<Vec<Task>>;

    async fn task_insert(&self, t: &Task) -> RtqsResult<()>;

    /// Apply an update and bump `updated_at`.
    async fn task_update(&self, id: TaskId, update: TaskUpdate) -> RtqsResult<()>;

    /// Delete a task and its scores.
    async fn task_delete(&self, id: TaskId) -> RtqsResult<()>;

    async fn task_score_list(&self) -> RtqsResult<Vec<TaskScore>>;

    /// Insert or replace the score keyed by `(task_id, dimension_id)`.
    async fn task_score_upsert(&self, score: &TaskScore) -> RtqsResult<()>;

    async fn task_priority_view(&self) -> RtqsResult<Vec<TaskPriorityView>> {
        Err(StorageError::ViewUnavailable {
            view: TASK_PRIORITY_VIEW.to_string(),
        }
        .into())
    }
}
