//! Task board
//!
//! Tasks carry their own points and gate and are scored on the active task
//! dimensions. There is no proposal workflow and no stored status: a task is
//! prioritized whenever its authoritative scores and points satisfy the
//! predicate.

use crate::registry::CoefficientRegistry;
use crate::staging::{
    ConfirmOutcome, FieldEdit, FlushSet, PendingEdits, StageState, TaskEdit, TaskField,
};
use crate::ViewSource;
use rtqs_core::{
    compare_task_views, derive_task_view, rank_tasks, DashboardConfig, EntityType, RankedTasks,
    RecordRef, RtqsError, RtqsResult, StorageError, Task, TaskId, TaskPriorityView, TaskScore,
    TaskScores, ValidationError, ViewDivergence,
};
use rtqs_storage::{RecordStore, TaskUpdate, WriteBatch};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A task with pending edits applied and the resulting preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDisplay {
    pub task: Task,
    pub scores: TaskScores,
    pub value: f64,
    pub priority: f64,
    pub state: StageState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub ranked: RankedTasks,
    pub divergences: Vec<ViewDivergence>,
    pub view_source: ViewSource,
}

#[derive(Debug, Default)]
struct TaskBoardState {
    tasks: HashMap<TaskId, TaskPriorityView>,
    edits: PendingEdits<TaskId, TaskEdit>,
    flushing: FlushSet<TaskId>,
    divergences: Vec<ViewDivergence>,
    view_source: ViewSource,
}

impl TaskBoardState {
    fn view(&self, id: TaskId) -> RtqsResult<&TaskPriorityView> {
        self.tasks.get(&id).ok_or_else(|| {
            ValidationError::UnknownRecord {
                entity_type: EntityType::Task,
                id: id.as_uuid(),
            }
            .into()
        })
    }
}

/// Task session against a [`RecordStore`].
pub struct TaskBoard<S: RecordStore> {
    store: Arc<S>,
    registry: CoefficientRegistry<S>,
    config: DashboardConfig,
    state: RwLock<TaskBoardState>,
}

impl<S: RecordStore> TaskBoard<S> {
    pub fn new(store: Arc<S>, config: DashboardConfig) -> Self {
        let registry = CoefficientRegistry::new(store.clone(), config.task_name_policy);
        Self {
            store,
            registry,
            config,
            state: RwLock::new(TaskBoardState::default()),
        }
    }

    pub fn registry(&self) -> &CoefficientRegistry<S> {
        &self.registry
    }

    fn read(&self) -> RtqsResult<RwLockReadGuard<'_, TaskBoardState>> {
        Ok(self.state.read().map_err(|_| StorageError::LockPoisoned)?)
    }

    fn write(&self) -> RtqsResult<RwLockWriteGuard<'_, TaskBoardState>> {
        Ok(self.state.write().map_err(|_| StorageError::LockPoisoned)?)
    }

    /// Refetch dimensions, tasks and scores.
    pub async fn load(&self) -> RtqsResult<()> {
        self.registry.load().await?;
        let table = self.registry.coefficients()?;

        let (views, view_source) = match self.store.task_priority_view().await {
            Ok(views) => (views, ViewSource::Store),
            Err(RtqsError::Storage(StorageError::ViewUnavailable { view })) => {
                tracing::warn!(view = %view, "Priority view unavailable, deriving locally");
                let tasks = self.store.task_list().await?;
                let grouped = TaskScores::group(&self.store.task_score_list().await?);
                let empty = TaskScores::default();
                let views = tasks
                    .iter()
                    .map(|t| derive_task_view(t, grouped.get(&t.task_id).unwrap_or(&empty), &table))
                    .collect();
                (views, ViewSource::Local)
            }
            Err(e) => return Err(e),
        };

        let mut divergences = Vec::new();
        if view_source == ViewSource::Store {
            for view in &views {
                let local = derive_task_view(&view.task, &view.scores, &table);
                for d in compare_task_views(view, &local, self.config.view_tolerance) {
                    tracing::warn!(
                        task_id = %view.task.task_id,
                        column = %d.column,
                        store_value = d.store_value,
                        local_value = d.local_value,
                        "Priority view diverges from local computation"
                    );
                    divergences.push(d);
                }
            }
        }

        let mut state = self.write()?;
        state.tasks = views.into_iter().map(|v| (v.task.task_id, v)).collect();
        let TaskBoardState { tasks, edits, .. } = &mut *state;
        edits.retain(|id| tasks.contains_key(id));
        state.divergences = divergences;
        state.view_source = view_source;
        tracing::debug!(tasks = state.tasks.len(), ?view_source, "Loaded task board");
        Ok(())
    }

    /// Create a one-point task without gate.
    pub async fn create_task(&self, title: &str, link: Option<String>) -> RtqsResult<TaskId> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "title".to_string(),
                reason: "title must not be empty".to_string(),
            }
            .into());
        }
        let task = Task::new(trimmed, link);
        self.store.task_insert(&task).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to create task");
        })?;
        tracing::info!(task_id = %task.task_id, "Created task");
        self.load().await?;
        Ok(task.task_id)
    }

    /// Delete a task with its scores; pending edits are dropped.
    pub async fn delete_task(&self, id: TaskId) -> RtqsResult<()> {
        self.read()?.view(id)?;
        self.store.task_delete(id).await.inspect_err(|e| {
            tracing::error!(task_id = %id, error = %e, "Failed to delete task");
        })?;
        self.write()?.edits.clear(id);
        tracing::info!(task_id = %id, "Deleted task");
        self.load().await
    }

    /// Record a pending task edit. Scores may only target active dimensions.
    pub fn set_task_field(&self, id: TaskId, edit: TaskEdit) -> RtqsResult<()> {
        if let TaskEdit::Score(dimension_id, _) = &edit {
            let table = self.registry.coefficients()?;
            if !table.active().iter().any(|d| d.dimension_id == *dimension_id) {
                return Err(ValidationError::UnknownRecord {
                    entity_type: EntityType::Dimension,
                    id: dimension_id.as_uuid(),
                }
                .into());
            }
        }
        let mut state = self.write()?;
        state.view(id)?;
        tracing::debug!(task_id = %id, field = ?edit.field(), "Staged task edit");
        state.edits.set(id, edit);
        Ok(())
    }

    pub fn display_value(&self, id: TaskId, field: TaskField) -> RtqsResult<TaskEdit> {
        let state = self.read()?;
        let view = state.view(id)?;
        Ok(state.edits.display_value(id, view, field))
    }

    /// Task and scores with pending edits applied, plus the live preview.
    pub fn display(&self, id: TaskId) -> RtqsResult<TaskDisplay> {
        let table = self.registry.coefficients()?;
        let state = self.read()?;
        let view = state.view(id)?;
        let merged = state.edits.overlay(id, view);
        let preview = derive_task_view(&merged.task, &merged.scores, &table);
        Ok(TaskDisplay {
            task: merged.task,
            scores: merged.scores,
            value: preview.value,
            priority: preview.priority,
            state: StageState::from_flags(state.edits.is_dirty(id), state.flushing.contains(id)),
        })
    }

    pub fn stage_state(&self, id: TaskId) -> RtqsResult<StageState> {
        let state = self.read()?;
        state.view(id)?;
        Ok(StageState::from_flags(
            state.edits.is_dirty(id),
            state.flushing.contains(id),
        ))
    }

    /// Write the task's field edits, then one score upsert per pending
    /// score, then reload. Edits stay pending if any write fails; edits
    /// staged while the writes are in flight stay pending either way.
    pub async fn confirm(&self, id: TaskId) -> RtqsResult<ConfirmOutcome> {
        let flushed = {
            let mut state = self.write()?;
            state.view(id)?;
            if state.flushing.contains(id) {
                tracing::warn!(task_id = %id, "Confirm already in flight, ignoring");
                return Ok(ConfirmOutcome::AlreadyFlushing);
            }
            if !state.edits.is_dirty(id) {
                return Ok(ConfirmOutcome::NothingToConfirm);
            }
            state.flushing.begin(id);
            state.edits.snapshot(id)
        };

        let mut update = TaskUpdate::default();
        let mut scores = Vec::new();
        for edit in &flushed {
            match edit {
                TaskEdit::Title(title) => update.title = Some(title.clone()),
                TaskEdit::Link(link) => update.link = Some(link.clone()),
                TaskEdit::Points(points) => update.points = Some(*points),
                TaskEdit::Gate(gate) => update.gate = Some(*gate),
                TaskEdit::Score(dimension_id, score) => scores.push(TaskScore {
                    task_id: id,
                    dimension_id: *dimension_id,
                    score: *score,
                }),
            }
        }

        let result = self.flush(id, update, scores).await;

        let mut state = self.write()?;
        state.flushing.finish(id);
        match &result {
            Ok(ConfirmOutcome::Confirmed { writes, .. }) => {
                state.edits.clear_flushed(id, &flushed);
                tracing::info!(
                    task_id = %id,
                    writes,
                    still_pending = state.edits.is_dirty(id),
                    "Confirmed task"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    task_id = %id,
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
        id: TaskId,
        update: TaskUpdate,
        scores: Vec<TaskScore>,
    ) -> RtqsResult<ConfirmOutcome> {
        let write_task = !update.is_empty();
        let mut batch = WriteBatch::new(usize::from(write_task) + scores.len());

        if write_task {
            batch.record(
                RecordRef::new(EntityType::Task, id),
                self.store.task_update(id, update).await,
            )?;
        }
        for score in &scores {
            batch.record(
                RecordRef::new(EntityType::TaskScore, id),
                self.store.task_score_upsert(score).await,
            )?;
        }

        self.load().await?;
        Ok(ConfirmOutcome::Confirmed {
            writes: batch.committed(),
            status_change: None,
        })
    }

    /// Ranked lists from authoritative rows only.
    pub fn snapshot(&self) -> RtqsResult<TaskSnapshot> {
        let table = self.registry.coefficients()?;
        let state = self.read()?;
        Ok(TaskSnapshot {
            ranked: rank_tasks(state.tasks.values().cloned(), &table),
            divergences: state.divergences.clone(),
            view_source: state.view_source,
        })
    }
}
