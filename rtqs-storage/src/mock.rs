//! In-memory record store for tests and local development.
//!
//! Derived views are computed with the same engine functions the boards use,
//! so a healthy mock never diverges from a local derivation. Failure injection
//! and view skew exist to exercise the paths where the real store misbehaves.

use crate::{
    DimensionFilter, DimensionUpdate, EpicUpdate, RecordStore, StoryFilter, StoryUpdate,
    TaskUpdate,
};
use ::async_trait::async_trait;
use chrono::Utc;
use rtqs_core::{
    derive_epic_view, derive_task_view, CoefficientTable, Dimension, DimensionId, EntityType, Epic,
    EpicId, EpicPriorityView, RecordRef, RtqsResult, StorageError, Story, StoryId, Task, TaskId,
    TaskPriorityView, TaskScore, TaskScores,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Kind of write a [`FailurePoint`] intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOp {
    Insert,
    /// Field updates and task score upserts
    Update,
    Delete,
}

/// A write the mock should reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailurePoint {
    pub op: WriteOp,
    pub entity_type: EntityType,
    /// Restrict to one record; `None` matches every record of the type
    pub id: Option<Uuid>,
}

impl FailurePoint {
    pub fn insert(entity_type: EntityType) -> Self {
        Self {
            op: WriteOp::Insert,
            entity_type,
            id: None,
        }
    }

    pub fn update(entity_type: EntityType) -> Self {
        Self {
            op: WriteOp::Update,
            entity_type,
            id: None,
        }
    }

    pub fn update_record(record: RecordRef) -> Self {
        Self {
            op: WriteOp::Update,
            entity_type: record.entity_type,
            id: Some(record.id),
        }
    }

    pub fn delete(entity_type: EntityType) -> Self {
        Self {
            op: WriteOp::Delete,
            entity_type,
            id: None,
        }
    }

    fn matches(&self, op: WriteOp, entity_type: EntityType, id: Option<Uuid>) -> bool {
        self.op == op
            && self.entity_type == entity_type
            && match (self.id, id) {
                (None, _) => true,
                (Some(want), Some(got)) => want == got,
                (Some(_), None) => false,
            }
    }
}

/// In-memory mock record store.
#[derive(Debug, Default)]
pub struct MockRecordStore {
    dimensions: Arc<RwLock<HashMap<DimensionId, Dimension>>>,
    epics: Arc<RwLock<HashMap<EpicId, Epic>>>,
    stories: Arc<RwLock<HashMap<StoryId, Story>>>,
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
    task_scores: Arc<RwLock<HashMap<(TaskId, DimensionId), TaskScore>>>,
    failures: Arc<RwLock<Vec<FailurePoint>>>,
    views_unavailable: AtomicBool,
    view_skew: Arc<RwLock<f64>>,
    writes: AtomicUsize,
}

impl MockRecordStore {
    /// Create a new mock store with derived views available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent write matching `point` until cleared.
    pub fn fail_on(&self, point: FailurePoint) -> RtqsResult<()> {
        self.failures
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .push(point);
        Ok(())
    }

    pub fn clear_failures(&self) -> RtqsResult<()> {
        self.failures
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .clear();
        Ok(())
    }

    /// Toggle the derived priority views. When unavailable both view
    /// reads report [`StorageError::ViewUnavailable`].
    pub fn set_views_available(&self, available: bool) {
        self.views_unavailable.store(!available, Ordering::SeqCst);
    }

    /// Offset added to the `priority` column of every derived view row,
    /// simulating a store whose computed columns disagree with the engine.
    pub fn skew_priority_views(&self, delta: f64) -> RtqsResult<()> {
        *self
            .view_skew
            .write()
            .map_err(|_| StorageError::LockPoisoned)? = delta;
        Ok(())
    }

    /// Number of writes that have committed.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn dimension_count(&self) -> RtqsResult<usize> {
        Ok(self
            .dimensions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .len())
    }

    pub fn epic_count(&self) -> RtqsResult<usize> {
        Ok(self.epics.read().map_err(|_| StorageError::LockPoisoned)?.len())
    }

    pub fn story_count(&self) -> RtqsResult<usize> {
        Ok(self
            .stories
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .len())
    }

    pub fn task_count(&self) -> RtqsResult<usize> {
        Ok(self.tasks.read().map_err(|_| StorageError::LockPoisoned)?.len())
    }

    pub fn task_score_count(&self) -> RtqsResult<usize> {
        Ok(self
            .task_scores
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .len())
    }

    fn check_injected(
        &self,
        op: WriteOp,
        entity_type: EntityType,
        id: Option<Uuid>,
    ) -> Result<(), StorageError> {
        let failures = self.failures.read().map_err(|_| StorageError::LockPoisoned)?;
        if !failures.iter().any(|f| f.matches(op, entity_type, id)) {
            return Ok(());
        }
        let reason = "injected failure".to_string();
        let id = id.unwrap_or_else(Uuid::nil);
        Err(match op {
            WriteOp::Insert => StorageError::InsertFailed {
                entity_type,
                reason,
            },
            WriteOp::Update => StorageError::UpdateFailed {
                entity_type,
                id,
                reason,
            },
            WriteOp::Delete => StorageError::DeleteFailed {
                entity_type,
                id,
                reason,
            },
        })
    }

    fn committed(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn check_view(&self, view: &str) -> Result<f64, StorageError> {
        if self.views_unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::ViewUnavailable {
                view: view.to_string(),
            });
        }
        let skew = *self.view_skew.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(skew)
    }

    fn coefficient_table(&self) -> Result<CoefficientTable, StorageError> {
        let dimensions = self
            .dimensions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        let mut active: Vec<Dimension> = dimensions.values().cloned().collect();
        active.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(CoefficientTable::from_dimensions(&active))
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    // === Dimension Operations ===

    async fn dimension_list(&self, filter: DimensionFilter) -> RtqsResult<Vec<Dimension>> {
        let dimensions = self
            .dimensions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        let mut listed: Vec<Dimension> = dimensions
            .values()
            .filter(|d| !filter.active_only || d.is_active)
            .cloned()
            .collect();
        listed.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(listed)
    }

    async fn dimension_insert(&self, d: &Dimension) -> RtqsResult<()> {
        self.check_injected(WriteOp::Insert, EntityType::Dimension, Some(d.dimension_id.as_uuid()))?;
        let mut dimensions = self
            .dimensions
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if dimensions.contains_key(&d.dimension_id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Dimension,
                reason: "already exists".to_string(),
            }
            .into());
        }
        dimensions.insert(d.dimension_id, d.clone());
        self.committed();
        Ok(())
    }

    async fn dimension_update(&self, id: DimensionId, update: DimensionUpdate) -> RtqsResult<()> {
        self.check_injected(WriteOp::Update, EntityType::Dimension, Some(id.as_uuid()))?;
        let mut dimensions = self
            .dimensions
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let dimension = dimensions.get_mut(&id).ok_or(StorageError::NotFound {
            entity_type: EntityType::Dimension,
            id: id.as_uuid(),
        })?;

        if let Some(name) = update.name {
            dimension.name = name;
        }
        if let Some(coefficient) = update.coefficient {
            dimension.coefficient = coefficient;
        }
        if let Some(sort_order) = update.sort_order {
            dimension.sort_order = sort_order;
        }
        if let Some(is_active) = update.is_active {
            dimension.is_active = is_active;
        }
        self.committed();
        Ok(())
    }

    async fn dimension_delete(&self, id: DimensionId) -> RtqsResult<()> {
        self.check_injected(WriteOp::Delete, EntityType::Dimension, Some(id.as_uuid()))?;
        let mut dimensions = self
            .dimensions
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if dimensions.remove(&id).is_none() {
            return Err(StorageError::NotFound {
                entity_type: EntityType::Dimension,
                id: id.as_uuid(),
            }
            .into());
        }
        self.task_scores
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .retain(|(_, dimension_id), _| *dimension_id != id);
        self.committed();
        Ok(())
    }

    // === Epic Operations ===

    async fn epic_list(&self) -> RtqsResult<Vec<Epic>> {
        let epics = self.epics.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut listed: Vec<Epic> = epics.values().cloned().collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.epic_id.cmp(&b.epic_id)));
        Ok(listed)
    }

    async fn epic_get(&self, id: EpicId) -> RtqsResult<Option<Epic>> {
        let epics = self.epics.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(epics.get(&id).cloned())
    }

    async fn epic_insert(&self, e: &Epic) -> RtqsResult<()> {
        self.check_injected(WriteOp::Insert, EntityType::Epic, Some(e.epic_id.as_uuid()))?;
        let mut epics = self.epics.write().map_err(|_| StorageError::LockPoisoned)?;
        if epics.contains_key(&e.epic_id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Epic,
                reason: "already exists".to_string(),
            }
            .into());
        }
        epics.insert(e.epic_id, e.clone());
        self.committed();
        Ok(())
    }

    async fn epic_update(&self, id: EpicId, update: EpicUpdate) -> RtqsResult<()> {
        self.check_injected(WriteOp::Update, EntityType::Epic, Some(id.as_uuid()))?;
        let mut epics = self.epics.write().map_err(|_| StorageError::LockPoisoned)?;
        let epic = epics.get_mut(&id).ok_or(StorageError::NotFound {
            entity_type: EntityType::Epic,
            id: id.as_uuid(),
        })?;

        if let Some(title) = update.title {
            epic.title = title;
        }
        if let Some(link) = update.link {
            epic.link = link;
        }
        if let Some(r) = update.r {
            epic.scores.r = r;
        }
        if let Some(t) = update.t {
            epic.scores.t = t;
        }
        if let Some(q) = update.q {
            epic.scores.q = q;
        }
        if let Some(s) = update.s {
            epic.scores.s = s;
        }
        if let Some(status) = update.status {
            epic.status = status;
        }
        if let Some(is_confirmed) = update.is_confirmed {
            epic.is_confirmed = is_confirmed;
        }
        epic.updated_at = Utc::now();
        self.committed();
        Ok(())
    }

    async fn epic_delete(&self, id: EpicId) -> RtqsResult<()> {
        self.check_injected(WriteOp::Delete, EntityType::Epic, Some(id.as_uuid()))?;
        let mut epics = self.epics.write().map_err(|_| StorageError::LockPoisoned)?;
        if epics.remove(&id).is_none() {
            return Err(StorageError::NotFound {
                entity_type: EntityType::Epic,
                id: id.as_uuid(),
            }
            .into());
        }
        self.stories
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .retain(|_, s| s.epic_id != id);
        self.committed();
        Ok(())
    }

    async fn epic_priority_view(&self) -> RtqsResult<Vec<EpicPriorityView>> {
        let skew = self.check_view(crate::store::EPIC_PRIORITY_VIEW)?;
        let table = self.coefficient_table()?;
        let stories: Vec<Story> = self
            .stories
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .values()
            .cloned()
            .collect();
        let epics = self.epics.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut rows: Vec<EpicPriorityView> = epics
            .values()
            .map(|epic| {
                let mut row = derive_epic_view(epic, &stories, &table);
                row.priority += skew;
                row
            })
            .collect();
        rows.sort_by(|a, b| a.epic.created_at.cmp(&b.epic.created_at));
        Ok(rows)
    }

    // === Story Operations ===

    async fn story_list(&self, filter: StoryFilter) -> RtqsResult<Vec<Story>> {
        let stories = self.stories.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut listed: Vec<Story> = stories
            .values()
            .filter(|s| filter.epic_id.map_or(true, |id| s.epic_id == id))
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .cloned()
            .collect();
        listed.sort_by(|a, b| {
            a.epic_id
                .cmp(&b.epic_id)
                .then(a.order_index.cmp(&b.order_index))
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(listed)
    }

    async fn story_insert(&self, s: &Story) -> RtqsResult<()> {
        self.check_injected(WriteOp::Insert, EntityType::Story, Some(s.story_id.as_uuid()))?;
        if !self
            .epics
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .contains_key(&s.epic_id)
        {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Story,
                reason: format!("parent epic {} does not exist", s.epic_id),
            }
            .into());
        }
        let mut stories = self.stories.write().map_err(|_| StorageError::LockPoisoned)?;
        if stories.contains_key(&s.story_id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Story,
                reason: "already exists".to_string(),
            }
            .into());
        }
        stories.insert(s.story_id, s.clone());
        self.committed();
        Ok(())
    }

    async fn story_update(&self, id: StoryId, update: StoryUpdate) -> RtqsResult<()> {
        self.check_injected(WriteOp::Update, EntityType::Story, Some(id.as_uuid()))?;
        let mut stories = self.stories.write().map_err(|_| StorageError::LockPoisoned)?;
        let story = stories.get_mut(&id).ok_or(StorageError::NotFound {
            entity_type: EntityType::Story,
            id: id.as_uuid(),
        })?;

        if let Some(title) = update.title {
            story.title = title;
        }
        if let Some(link) = update.link {
            story.link = link;
        }
        if let Some(points) = update.points {
            story.points = points;
        }
        if let Some(gate) = update.gate {
            story.gate = gate;
        }
        if let Some(order_index) = update.order_index {
            story.order_index = order_index;
        }
        if let Some(status) = update.status {
            story.status = status;
        }
        story.updated_at = Utc::now();
        self.committed();
        Ok(())
    }

    async fn story_delete(&self, id: StoryId) -> RtqsResult<()> {
        self.check_injected(WriteOp::Delete, EntityType::Story, Some(id.as_uuid()))?;
        let mut stories = self.stories.write().map_err(|_| StorageError::LockPoisoned)?;
        if stories.remove(&id).is_none() {
            return Err(StorageError::NotFound {
                entity_type: EntityType::Story,
                id: id.as_uuid(),
            }
            .into());
        }
        self.committed();
        Ok(())
    }

    // === Task Operations ===

    async fn task_list(&self) -> RtqsResult<Vec<Task>> {
        let tasks = self.tasks.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut listed: Vec<Task> = tasks.values().cloned().collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.task_id.cmp(&b.task_id)));
        Ok(listed)
    }

    async fn task_insert(&self, t: &Task) -> RtqsResult<()> {
        self.check_injected(WriteOp::Insert, EntityType::Task, Some(t.task_id.as_uuid()))?;
        let mut tasks = self.tasks.write().map_err(|_| StorageError::LockPoisoned)?;
        if tasks.contains_key(&t.task_id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Task,
                reason: "already exists".to_string(),
            }
            .into());
        }
        tasks.insert(t.task_id, t.clone());
        self.committed();
        Ok(())
    }

    async fn task_update(&self, id: TaskId, update: TaskUpdate) -> RtqsResult<()> {
        self.check_injected(WriteOp::Update, EntityType::Task, Some(id.as_uuid()))?;
        let mut tasks = self.tasks.write().map_err(|_| StorageError::LockPoisoned)?;
        let task = tasks.get_mut(&id).ok_or(StorageError::NotFound {
            entity_type: EntityType::Task,
            id: id.as_uuid(),
        })?;

        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(link) = update.link {
            task.link = link;
        }
        if let Some(points) = update.points {
            task.points = points;
        }
        if let Some(gate) = update.gate {
            task.gate = gate;
        }
        task.updated_at = Utc::now();
        self.committed();
        Ok(())
    }

    async fn task_delete(&self, id: TaskId) -> RtqsResult<()> {
        self.check_injected(WriteOp::Delete, EntityType::Task, Some(id.as_uuid()))?;
        let mut tasks = self.tasks.write().map_err(|_| StorageError::LockPoisoned)?;
        if tasks.remove(&id).is_none() {
            return Err(StorageError::NotFound {
                entity_type: EntityType::Task,
                id: id.as_uuid(),
            }
            .into());
        }
        self.task_scores
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .retain(|(task_id, _), _| *task_id != id);
        self.committed();
        Ok(())
    }

    async fn task_score_list(&self) -> RtqsResult<Vec<TaskScore>> {
        let scores = self
            .task_scores
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        let mut listed: Vec<TaskScore> = scores.values().copied().collect();
        listed.sort_by_key(|s| (s.task_id, s.dimension_id));
        Ok(listed)
    }

    async fn task_score_upsert(&self, score: &TaskScore) -> RtqsResult<()> {
        self.check_injected(WriteOp::Update, EntityType::TaskScore, Some(score.task_id.as_uuid()))?;
        if !self
            .tasks
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .contains_key(&score.task_id)
        {
            return Err(StorageError::NotFound {
                entity_type: EntityType::Task,
                id: score.task_id.as_uuid(),
            }
            .into());
        }
        self.task_scores
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .insert((score.task_id, score.dimension_id), *score);
        self.committed();
        Ok(())
    }

    async fn task_priority_view(&self) -> RtqsResult<Vec<TaskPriorityView>> {
        let skew = self.check_view(crate::store::TASK_PRIORITY_VIEW)?;
        let table = self.coefficient_table()?;
        let rows: Vec<TaskScore> = self
            .task_scores
            .read()
            .map_err(|_| StorageError::LockPoisoned)?
            .values()
            .copied()
            .collect();
        let grouped = TaskScores::group(&rows);
        let empty = TaskScores::default();
        let tasks = self.tasks.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut views: Vec<TaskPriorityView> = tasks
            .values()
            .map(|task| {
                let scores = grouped.get(&task.task_id).unwrap_or(&empty);
                let mut view = derive_task_view(task, scores, &table);
                view.priority += skew;
                view
            })
            .collect();
        views.sort_by(|a, b| a.task.created_at.cmp(&b.task.created_at));
        Ok(views)
    }
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use rtqs_core::{EpicStatus, MoveDirection, StoryStatus};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Any sequence of neighbour swaps keeps the indices a permutation of 0..n.
        #[test]
        fn prop_swaps_preserve_dense_ordering(
            n in 1usize..8,
            moves in proptest::collection::vec((0usize..8, any::<bool>()), 0..20),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MockRecordStore::new();
                let epic = Epic::new("e", None, EpicStatus::Unprioritized);
                store.epic_insert(&epic).await.unwrap();
                for i in 0..n {
                    let story = Story::new(epic.epic_id, format!("s{i}"), i as i32, StoryStatus::Official);
                    store.story_insert(&story).await.unwrap();
                }
                for (pick, up) in moves {
                    let listed = store.story_list(StoryFilter::for_epic(epic.epic_id)).await.unwrap();
                    let index = pick % listed.len();
                    let direction = if up { MoveDirection::Up } else { MoveDirection::Down };
                    if let Some(other) = direction.neighbour(index, listed.len()) {
                        store.story_swap_order(&listed[index], &listed[other]).await.unwrap();
                    }
                }
                let mut indices: Vec<i32> = store
                    .story_list(StoryFilter::for_epic(epic.epic_id))
                    .await
                    .unwrap()
                    .iter()
                    .map(|s| s.order_index)
                    .collect();
                indices.sort();
                let expected: Vec<i32> = (0..n as i32).collect();
                assert_eq!(indices, expected);
            });
        }
    }
}
