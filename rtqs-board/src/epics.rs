//! Epic board
//!
//! Session object for the epic/story page: authoritative epic views and
//! stories from the last load, pending epic and story edits on top of them,
//! and the confirm flow that writes the edits back.

use crate::registry::CoefficientRegistry;
use crate::staging::{
    ConfirmOutcome, EpicEdit, EpicField, FieldEdit, FlushSet, PendingEdits, StageState, StoryEdit,
    StoryField,
};
use crate::ViewSource;
use rtqs_core::{
    analytics_report, compare_epic_views, derive_epic_view, epic_view_is_prioritized, rank_epics,
    AnalyticsReport, DashboardConfig, EntityType, Epic, EpicId, EpicPriorityView, EpicStatus,
    MoveDirection, RankedEpics, RecordRef, RtqsDimension, RtqsError, RtqsResult, StorageError,
    Story, StoryId, StoryPoints, StoryStatus, ValidationError, ViewDivergence,
};
use rtqs_storage::{EpicUpdate, RecordStore, StoryFilter, StoryUpdate, WriteBatch};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

const NEW_STORY_TITLE: &str = "New Story";
const PROPOSED_STORY_TITLE: &str = "Proposed Story";

// ============================================================================
// READ MODELS
// ============================================================================

/// An epic as the form shows it: authoritative values with pending edits
/// applied, and the live value/priority preview those edits produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpicDisplay {
    pub epic: Epic,
    pub stories: Vec<Story>,
    pub value: f64,
    pub total_effort: u32,
    pub priority: f64,
    pub gate_count: u32,
    pub state: StageState,
}

/// Ranked lists plus anything the last load found suspicious.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpicSnapshot {
    pub ranked: RankedEpics,
    pub divergences: Vec<ViewDivergence>,
    pub view_source: ViewSource,
}

#[derive(Debug, Default)]
struct EpicBoardState {
    epics: HashMap<EpicId, EpicPriorityView>,
    /// Stories per epic in `order_index` order
    stories: HashMap<EpicId, Vec<Story>>,
    epic_edits: PendingEdits<EpicId, EpicEdit>,
    story_edits: PendingEdits<StoryId, StoryEdit>,
    flushing: FlushSet<EpicId>,
    divergences: Vec<ViewDivergence>,
    view_source: ViewSource,
}

impl EpicBoardState {
    fn view(&self, id: EpicId) -> RtqsResult<&EpicPriorityView> {
        self.epics.get(&id).ok_or_else(|| unknown(EntityType::Epic, id))
    }

    fn story(&self, id: StoryId) -> RtqsResult<&Story> {
        self.stories
            .values()
            .flatten()
            .find(|s| s.story_id == id)
            .ok_or_else(|| unknown(EntityType::Story, id))
    }

    fn children(&self, id: EpicId) -> &[Story] {
        self.stories.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn is_dirty(&self, id: EpicId) -> bool {
        self.epic_edits.is_dirty(id)
            || self
                .children(id)
                .iter()
                .any(|s| self.story_edits.is_dirty(s.story_id))
    }

    fn all_stories(&self) -> Vec<Story> {
        self.stories.values().flatten().cloned().collect()
    }
}

fn unknown(entity_type: EntityType, id: impl Into<Uuid>) -> RtqsError {
    ValidationError::UnknownRecord {
        entity_type,
        id: id.into(),
    }
    .into()
}

fn check_title(title: &str) -> RtqsResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "title".to_string(),
            reason: "title must not be empty".to_string(),
        }
        .into());
    }
    Ok(trimmed.to_string())
}

fn epic_update_from<'a>(edits: impl IntoIterator<Item = &'a EpicEdit>) -> EpicUpdate {
    let mut update = EpicUpdate::default();
    for edit in edits {
        match edit {
            EpicEdit::Title(title) => update.title = Some(title.clone()),
            EpicEdit::Link(link) => update.link = Some(link.clone()),
            EpicEdit::Score(d, score) => match d {
                RtqsDimension::R => update.r = Some(*score),
                RtqsDimension::T => update.t = Some(*score),
                RtqsDimension::Q => update.q = Some(*score),
                RtqsDimension::S => update.s = Some(*score),
            },
        }
    }
    update
}

fn story_update_from<'a>(edits: impl IntoIterator<Item = &'a StoryEdit>) -> StoryUpdate {
    let mut update = StoryUpdate::default();
    for edit in edits {
        match edit {
            StoryEdit::Title(title) => update.title = Some(title.clone()),
            StoryEdit::Link(link) => update.link = Some(link.clone()),
            StoryEdit::Points(points) => update.points = Some(*points),
            StoryEdit::Gate(gate) => update.gate = Some(*gate),
        }
    }
    update
}

// ============================================================================
// EPIC BOARD
// ============================================================================

/// Epic and story session against a [`RecordStore`].
pub struct EpicBoard<S: RecordStore> {
    store: Arc<S>,
    registry: CoefficientRegistry<S>,
    config: DashboardConfig,
    state: RwLock<EpicBoardState>,
}

impl<S: RecordStore> EpicBoard<S> {
    pub fn new(store: Arc<S>, config: DashboardConfig) -> Self {
        let registry = CoefficientRegistry::new(store.clone(), config.epic_name_policy);
        Self {
            store,
            registry,
            config,
            state: RwLock::new(EpicBoardState::default()),
        }
    }

    pub fn registry(&self) -> &CoefficientRegistry<S> {
        &self.registry
    }

    fn read(&self) -> RtqsResult<RwLockReadGuard<'_, EpicBoardState>> {
        Ok(self.state.read().map_err(|_| StorageError::LockPoisoned)?)
    }

    fn write(&self) -> RtqsResult<RwLockWriteGuard<'_, EpicBoardState>> {
        Ok(self.state.write().map_err(|_| StorageError::LockPoisoned)?)
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Refetch dimensions, epic views and stories. Pending edits of records
    /// that still exist survive the reload.
    pub async fn load(&self) -> RtqsResult<()> {
        self.registry.load().await?;
        let table = self.registry.coefficients()?;
        let stories = self.store.story_list(StoryFilter::all()).await?;

        let (views, view_source) = match self.store.epic_priority_view().await {
            Ok(views) => (views, ViewSource::Store),
            Err(RtqsError::Storage(StorageError::ViewUnavailable { view })) => {
                tracing::warn!(view = %view, "Priority view unavailable, deriving locally");
                let epics = self.store.epic_list().await?;
                let views = epics
                    .iter()
                    .map(|e| derive_epic_view(e, &stories, &table))
                    .collect();
                (views, ViewSource::Local)
            }
            Err(e) => return Err(e),
        };

        let mut divergences = Vec::new();
        if view_source == ViewSource::Store {
            for view in &views {
                let local = derive_epic_view(&view.epic, &stories, &table);
                for d in compare_epic_views(view, &local, self.config.view_tolerance) {
                    tracing::warn!(
                        epic_id = %view.epic.epic_id,
                        column = %d.column,
                        store_value = d.store_value,
                        local_value = d.local_value,
                        "Priority view diverges from local computation"
                    );
                    divergences.push(d);
                }
            }
        }

        let mut grouped: HashMap<EpicId, Vec<Story>> = HashMap::new();
        for story in stories {
            grouped.entry(story.epic_id).or_default().push(story);
        }
        for children in grouped.values_mut() {
            children.sort_by_key(|s| s.order_index);
        }

        let mut state = self.write()?;
        state.epics = views.into_iter().map(|v| (v.epic.epic_id, v)).collect();
        state.stories = grouped;
        let EpicBoardState {
            epics,
            stories,
            epic_edits,
            story_edits,
            ..
        } = &mut *state;
        epic_edits.retain(|id| epics.contains_key(id));
        story_edits.retain(|id| stories.values().flatten().any(|s| s.story_id == *id));
        state.divergences = divergences;
        state.view_source = view_source;
        tracing::debug!(
            epics = state.epics.len(),
            divergences = state.divergences.len(),
            ?view_source,
            "Loaded epic board"
        );
        Ok(())
    }

    // ========================================================================
    // EPIC LIFECYCLE
    // ========================================================================

    async fn insert_epic(
        &self,
        title: &str,
        link: Option<String>,
        status: EpicStatus,
    ) -> RtqsResult<EpicId> {
        let title = check_title(title)?;
        let epic = Epic::new(title, link, status);
        self.store.epic_insert(&epic).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to create epic");
        })?;
        tracing::info!(epic_id = %epic.epic_id, %status, "Created epic");
        self.load().await?;
        Ok(epic.epic_id)
    }

    /// Create an official epic awaiting scores.
    pub async fn create_epic(&self, title: &str, link: Option<String>) -> RtqsResult<EpicId> {
        self.insert_epic(title, link, EpicStatus::Unprioritized).await
    }

    /// Create an epic that needs validation before it is ranked.
    pub async fn propose_epic(&self, title: &str, link: Option<String>) -> RtqsResult<EpicId> {
        self.insert_epic(title, link, EpicStatus::Proposed).await
    }

    /// Move a proposed epic into the ranked population, classified by its
    /// authoritative scores and effort.
    pub async fn validate_epic(&self, id: EpicId) -> RtqsResult<EpicStatus> {
        let status = {
            let state = self.read()?;
            let view = state.view(id)?;
            if !view.epic.status.is_proposed() {
                return Err(ValidationError::InvalidValue {
                    field: "status".to_string(),
                    reason: format!("epic {} is not proposed", id),
                }
                .into());
            }
            EpicStatus::from_predicate(epic_view_is_prioritized(view))
        };

        self.store
            .epic_update(
                id,
                EpicUpdate {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(epic_id = %id, %status, "Validated epic");
        self.load().await?;
        Ok(status)
    }

    /// Delete an epic and its stories; its pending edits are dropped.
    pub async fn delete_epic(&self, id: EpicId) -> RtqsResult<()> {
        let story_ids: Vec<StoryId> = {
            let state = self.read()?;
            state.view(id)?;
            state.children(id).iter().map(|s| s.story_id).collect()
        };
        self.store.epic_delete(id).await.inspect_err(|e| {
            tracing::error!(epic_id = %id, error = %e, "Failed to delete epic");
        })?;
        {
            let mut state = self.write()?;
            state.epic_edits.clear(id);
            for story_id in story_ids {
                state.story_edits.clear(story_id);
            }
        }
        tracing::info!(epic_id = %id, "Deleted epic");
        self.load().await
    }

    // ========================================================================
    // STORIES
    // ========================================================================

    /// Append a one-point story after the epic's last story.
    pub async fn add_story(&self, epic_id: EpicId, proposed: bool) -> RtqsResult<StoryId> {
        let next_index = {
            let state = self.read()?;
            state.view(epic_id)?;
            state
                .children(epic_id)
                .iter()
                .map(|s| s.order_index)
                .max()
                .map_or(0, |max| max + 1)
        };
        let (title, status) = if proposed {
            (PROPOSED_STORY_TITLE, StoryStatus::Proposed)
        } else {
            (NEW_STORY_TITLE, StoryStatus::Official)
        };
        let story = Story::new(epic_id, title, next_index, status);
        self.store.story_insert(&story).await?;
        tracing::info!(
            story_id = %story.story_id,
            epic_id = %epic_id,
            order_index = next_index,
            %status,
            "Added story"
        );
        self.load().await?;
        Ok(story.story_id)
    }

    /// Promote a proposed story so it counts toward effort.
    pub async fn validate_story(&self, id: StoryId) -> RtqsResult<()> {
        self.read()?.story(id)?;
        self.store
            .story_update(
                id,
                StoryUpdate {
                    status: Some(StoryStatus::Official),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(story_id = %id, "Validated story");
        self.load().await
    }

    /// Delete a story and close the gap it leaves in the ordering.
    pub async fn delete_story(&self, id: StoryId) -> RtqsResult<()> {
        let (story, later) = {
            let state = self.read()?;
            let story = state.story(id)?.clone();
            let later: Vec<Story> = state
                .children(story.epic_id)
                .iter()
                .filter(|s| s.order_index > story.order_index)
                .cloned()
                .collect();
            (story, later)
        };

        let mut batch = WriteBatch::new(1 + later.len());
        batch.record(
            RecordRef::new(EntityType::Story, id),
            self.store.story_delete(id).await,
        )?;
        self.write()?.story_edits.clear(id);
        for sibling in &later {
            batch
                .record(
                    RecordRef::new(EntityType::Story, sibling.story_id),
                    self.store
                        .story_update(
                            sibling.story_id,
                            StoryUpdate {
                                order_index: Some(sibling.order_index - 1),
                                ..Default::default()
                            },
                        )
                        .await,
                )
                .inspect_err(|e| {
                    tracing::error!(story_id = %sibling.story_id, error = %e, "Failed to compact story order");
                })?;
        }
        tracing::info!(story_id = %id, epic_id = %story.epic_id, shifted = later.len(), "Deleted story");
        self.load().await
    }

    /// Swap a story with its neighbour. Returns false, without writing, when
    /// the story is already at that end of the list.
    pub async fn move_story(&self, id: StoryId, direction: MoveDirection) -> RtqsResult<bool> {
        let pair = {
            let state = self.read()?;
            let story = state.story(id)?;
            let siblings = state.children(story.epic_id);
            let index = siblings
                .iter()
                .position(|s| s.story_id == id)
                .ok_or_else(|| unknown(EntityType::Story, id))?;
            direction
                .neighbour(index, siblings.len())
                .map(|other| (siblings[index].clone(), siblings[other].clone()))
        };
        let Some((story, neighbour)) = pair else {
            return Ok(false);
        };

        self.store.story_swap_order(&story, &neighbour).await?;
        tracing::info!(
            story_id = %id,
            epic_id = %story.epic_id,
            ?direction,
            "Moved story"
        );
        self.load().await?;
        Ok(true)
    }

    /// Authoritative stories of an epic in order.
    pub fn stories(&self, epic_id: EpicId) -> RtqsResult<Vec<Story>> {
        let state = self.read()?;
        state.view(epic_id)?;
        Ok(state.children(epic_id).to_vec())
    }

    // ========================================================================
    // STAGING
    // ========================================================================

    /// Record a pending epic edit. The authoritative row is untouched.
    pub fn set_epic_field(&self, id: EpicId, edit: EpicEdit) -> RtqsResult<()> {
        let mut state = self.write()?;
        state.view(id)?;
        tracing::debug!(epic_id = %id, field = ?edit.field(), "Staged epic edit");
        state.epic_edits.set(id, edit);
        Ok(())
    }

    /// Record a pending story edit; the parent epic becomes dirty.
    pub fn set_story_field(&self, id: StoryId, edit: StoryEdit) -> RtqsResult<()> {
        let mut state = self.write()?;
        let epic_id = state.story(id)?.epic_id;
        tracing::debug!(story_id = %id, %epic_id, field = ?edit.field(), "Staged story edit");
        state.story_edits.set(id, edit);
        Ok(())
    }

    /// Pending value of `field` if any, else the authoritative one.
    pub fn display_value(&self, id: EpicId, field: EpicField) -> RtqsResult<EpicEdit> {
        let state = self.read()?;
        let view = state.view(id)?;
        Ok(state.epic_edits.display_value(id, &view.epic, field))
    }

    pub fn story_display_value(&self, id: StoryId, field: StoryField) -> RtqsResult<StoryEdit> {
        let state = self.read()?;
        let story = state.story(id)?;
        Ok(state.story_edits.display_value(id, story, field))
    }

    /// The epic with its pending edits and those of its stories applied,
    /// and the value/priority preview computed from that overlay.
    pub fn display(&self, id: EpicId) -> RtqsResult<EpicDisplay> {
        let table = self.registry.coefficients()?;
        let state = self.read()?;
        let view = state.view(id)?;
        let epic = state.epic_edits.overlay(id, &view.epic);
        let stories: Vec<Story> = state
            .children(id)
            .iter()
            .map(|s| state.story_edits.overlay(s.story_id, s))
            .collect();
        let preview = derive_epic_view(&epic, &stories, &table);
        Ok(EpicDisplay {
            epic,
            stories,
            value: preview.value,
            total_effort: preview.total_effort,
            priority: preview.priority,
            gate_count: preview.gate_count,
            state: StageState::from_flags(state.is_dirty(id), state.flushing.contains(id)),
        })
    }

    pub fn stage_state(&self, id: EpicId) -> RtqsResult<StageState> {
        let state = self.read()?;
        state.view(id)?;
        Ok(StageState::from_flags(
            state.is_dirty(id),
            state.flushing.contains(id),
        ))
    }

    // ========================================================================
    // CONFIRM
    // ========================================================================

    /// Write the pending edits of an epic and its stories, reload, then
    /// persist the status the reloaded rows imply.
    ///
    /// On any failure the edits stay pending and the error is returned. A
    /// failure after at least one write landed is a
    /// [`rtqs_core::BatchError::PartialBatchFailure`].
    ///
    /// Edits staged while the writes are in flight are not part of the
    /// payload and stay pending after a successful confirm.
    pub async fn confirm(&self, id: EpicId) -> RtqsResult<ConfirmOutcome> {
        let (epic_flushed, story_flushed) = {
            let mut state = self.write()?;
            state.view(id)?;
            if state.flushing.contains(id) {
                tracing::warn!(epic_id = %id, "Confirm already in flight, ignoring");
                return Ok(ConfirmOutcome::AlreadyFlushing);
            }
            if !state.is_dirty(id) {
                return Ok(ConfirmOutcome::NothingToConfirm);
            }
            let epic_flushed = state.epic_edits.snapshot(id);
            let story_flushed: Vec<(StoryId, Vec<StoryEdit>)> = state
                .children(id)
                .iter()
                .filter(|s| state.story_edits.is_dirty(s.story_id))
                .map(|s| (s.story_id, state.story_edits.snapshot(s.story_id)))
                .collect();
            state.flushing.begin(id);
            (epic_flushed, story_flushed)
        };

        let epic_update = (!epic_flushed.is_empty()).then(|| EpicUpdate {
            is_confirmed: Some(true),
            ..epic_update_from(&epic_flushed)
        });
        let story_updates: Vec<(StoryId, StoryUpdate)> = story_flushed
            .iter()
            .map(|(story_id, edits)| (*story_id, story_update_from(edits)))
            .collect();

        let result = self.flush(id, epic_update, story_updates).await;

        let mut state = self.write()?;
        state.flushing.finish(id);
        match &result {
            Ok(ConfirmOutcome::Confirmed { writes, status_change }) => {
                state.epic_edits.clear_flushed(id, &epic_flushed);
                for (story_id, edits) in &story_flushed {
                    state.story_edits.clear_flushed(*story_id, edits);
                }
                tracing::info!(
                    epic_id = %id,
                    writes,
                    status_change = ?status_change,
                    still_pending = state.is_dirty(id),
                    "Confirmed epic"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    epic_id = %id,
                    error = %e,
                    partial = e.is_partial_batch(),
                    "Confirm failed, edits kept"
                );
            }
        }
        result
    }

    async fn flush(
        &self,
        id: EpicId,
        epic_update: Option<EpicUpdate>,
        story_updates: Vec<(StoryId, StoryUpdate)>,
    ) -> RtqsResult<ConfirmOutcome> {
        let mut batch = WriteBatch::new(usize::from(epic_update.is_some()) + story_updates.len());

        if let Some(update) = epic_update {
            batch.record(
                RecordRef::new(EntityType::Epic, id),
                self.store.epic_update(id, update).await,
            )?;
        }
        for (story_id, update) in story_updates {
            batch.record(
                RecordRef::new(EntityType::Story, story_id),
                self.store.story_update(story_id, update).await,
            )?;
        }

        self.load().await?;

        let transition = {
            let state = self.read()?;
            let view = state.view(id)?;
            if view.epic.status.is_proposed() {
                None
            } else {
                let status = EpicStatus::from_predicate(epic_view_is_prioritized(view));
                (status != view.epic.status).then_some(status)
            }
        };

        if let Some(status) = transition {
            batch.extend(1);
            batch.record(
                RecordRef::new(EntityType::Epic, id),
                self.store
                    .epic_update(
                        id,
                        EpicUpdate {
                            status: Some(status),
                            ..Default::default()
                        },
                    )
                    .await,
            )?;
            tracing::info!(epic_id = %id, %status, "Epic status changed");
            self.load().await?;
        }

        Ok(ConfirmOutcome::Confirmed {
            writes: batch.committed(),
            status_change: transition,
        })
    }

    // ========================================================================
    // READ MODELS
    // ========================================================================

    /// Ranked lists from authoritative rows only.
    pub fn snapshot(&self) -> RtqsResult<EpicSnapshot> {
        let state = self.read()?;
        Ok(EpicSnapshot {
            ranked: rank_epics(state.epics.values().cloned()),
            divergences: state.divergences.clone(),
            view_source: state.view_source,
        })
    }

    pub fn analytics(&self) -> RtqsResult<AnalyticsReport> {
        let state = self.read()?;
        let views: Vec<EpicPriorityView> = state.epics.values().cloned().collect();
        analytics_report(&views, &state.all_stories(), &self.config.analytics)
    }

    /// Points of a story including any pending edit.
    pub fn story_points(&self, id: StoryId) -> RtqsResult<StoryPoints> {
        let state = self.read()?;
        let story = state.story(id)?;
        Ok(state.story_edits.overlay(id, story).points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtqs_core::Score;
    use rtqs_storage::MockRecordStore;

    async fn board() -> EpicBoard<MockRecordStore> {
        let board = EpicBoard::new(Arc::new(MockRecordStore::new()), DashboardConfig::default());
        board.load().await.unwrap();
        board
    }

    #[tokio::test]
    async fn test_create_and_propose() {
        let board = board().await;
        let a = board.create_epic("Checkout", None).await.unwrap();
        let b = board.propose_epic("Search", None).await.unwrap();
        let snapshot = board.snapshot().unwrap();
        assert_eq!(snapshot.ranked.unprioritized[0].epic.epic_id, a);
        assert_eq!(snapshot.ranked.proposed[0].epic.epic_id, b);
        assert_eq!(snapshot.view_source, ViewSource::Store);
        assert!(board.create_epic("   ", None).await.is_err());
    }

    #[tokio::test]
    async fn test_add_story_appends_at_end() {
        let board = board().await;
        let epic = board.create_epic("Checkout", None).await.unwrap();
        board.add_story(epic, false).await.unwrap();
        let proposed = board.add_story(epic, true).await.unwrap();
        let stories = board.stories(epic).unwrap();
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].order_index, 0);
        assert_eq!(stories[0].title, NEW_STORY_TITLE);
        assert_eq!(stories[1].order_index, 1);
        assert_eq!(stories[1].story_id, proposed);
        assert_eq!(stories[1].status, StoryStatus::Proposed);
    }

    #[tokio::test]
    async fn test_display_overlays_without_touching_rank() {
        let board = board().await;
        let epic = board.create_epic("Checkout", None).await.unwrap();
        let story = board.add_story(epic, false).await.unwrap();
        for d in RtqsDimension::ALL {
            board
                .set_epic_field(epic, EpicEdit::Score(d, Score::new(2).unwrap()))
                .unwrap();
        }
        board
            .set_story_field(story, StoryEdit::Points(StoryPoints::new(8).unwrap()))
            .unwrap();

        let display = board.display(epic).unwrap();
        assert_eq!(display.value, 8.0);
        assert_eq!(display.total_effort, 8);
        assert_eq!(display.priority, 1.0);
        assert_eq!(display.state, StageState::Dirty);
        assert_eq!(board.story_points(story).unwrap().get(), 8);

        let snapshot = board.snapshot().unwrap();
        assert!(snapshot.ranked.prioritized.is_empty());
        assert_eq!(snapshot.ranked.unprioritized[0].value, 0.0);
    }

    #[tokio::test]
    async fn test_confirm_with_nothing_pending() {
        let board = board().await;
        let epic = board.create_epic("Checkout", None).await.unwrap();
        assert_eq!(
            board.confirm(epic).await.unwrap(),
            ConfirmOutcome::NothingToConfirm
        );
    }

    #[tokio::test]
    async fn test_validate_epic_requires_proposed() {
        let board = board().await;
        let epic = board.create_epic("Checkout", None).await.unwrap();
        assert!(board.validate_epic(epic).await.is_err());
        let proposed = board.propose_epic("Search", None).await.unwrap();
        assert_eq!(
            board.validate_epic(proposed).await.unwrap(),
            EpicStatus::Unprioritized
        );
    }

    #[tokio::test]
    async fn test_unknown_ids_are_validation_errors() {
        let board = board().await;
        let err = board
            .set_epic_field(EpicId::now_v7(), EpicEdit::Title("x".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            RtqsError::Validation(ValidationError::UnknownRecord { .. })
        ));
        assert!(board.move_story(StoryId::now_v7(), MoveDirection::Up).await.is_err());
    }
}
