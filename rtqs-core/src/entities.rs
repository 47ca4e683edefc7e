//! Core record structures

use crate::{
    DimensionId, EpicId, EpicStatus, RtqsDimension, Score, StoryId, StoryPoints, StoryStatus,
    TaskId, TaskScoreLevel, Timestamp,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dimension - a named, weighted scoring axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub dimension_id: DimensionId,
    pub name: String,
    pub coefficient: f64,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl Dimension {
    /// Create an active dimension at the given position.
    pub fn new(name: impl Into<String>, coefficient: f64, sort_order: i32) -> Self {
        Self {
            dimension_id: DimensionId::now_v7(),
            name: name.into(),
            coefficient,
            sort_order,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// The four epic dimension scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EpicScores {
    pub r: Score,
    pub t: Score,
    pub q: Score,
    pub s: Score,
}

impl EpicScores {
    pub fn new(r: Score, t: Score, q: Score, s: Score) -> Self {
        Self { r, t, q, s }
    }

    pub fn get(&self, dimension: RtqsDimension) -> Score {
        match dimension {
            RtqsDimension::R => self.r,
            RtqsDimension::T => self.t,
            RtqsDimension::Q => self.q,
            RtqsDimension::S => self.s,
        }
    }

    pub fn set(&mut self, dimension: RtqsDimension, score: Score) {
        match dimension {
            RtqsDimension::R => self.r = score,
            RtqsDimension::T => self.t = score,
            RtqsDimension::Q => self.q = score,
            RtqsDimension::S => self.s = score,
        }
    }

    /// True when every one of the four scores is set.
    pub fn all_set(&self) -> bool {
        RtqsDimension::ALL.iter().all(|d| self.get(*d).is_set())
    }
}

/// Epic - a scoreable item owning zero or more stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub epic_id: EpicId,
    pub title: String,
    pub link: Option<String>,
    #[serde(flatten)]
    pub scores: EpicScores,
    pub status: EpicStatus,
    pub is_confirmed: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Epic {
    /// Create an unscored epic with the given status.
    pub fn new(title: impl Into<String>, link: Option<String>, status: EpicStatus) -> Self {
        let now = Utc::now();
        Self {
            epic_id: EpicId::now_v7(),
            title: title.into(),
            link,
            scores: EpicScores::default(),
            status,
            is_confirmed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Story - child of an epic carrying the point estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub story_id: StoryId,
    pub epic_id: EpicId,
    pub title: String,
    pub link: Option<String>,
    pub points: StoryPoints,
    pub gate: bool,
    pub order_index: i32,
    pub status: StoryStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Story {
    pub fn new(
        epic_id: EpicId,
        title: impl Into<String>,
        order_index: i32,
        status: StoryStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            story_id: StoryId::now_v7(),
            epic_id,
            title: title.into(),
            link: None,
            points: StoryPoints::ONE,
            gate: false,
            order_index,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this story counts toward its epic's effort.
    pub fn is_official(&self) -> bool {
        self.status == StoryStatus::Official
    }
}

/// Task - a standalone scoreable item with a directly assigned estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub title: String,
    pub link: Option<String>,
    pub gate: bool,
    pub points: StoryPoints,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    pub fn new(title: impl Into<String>, link: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id: TaskId::now_v7(),
            title: title.into(),
            link,
            gate: false,
            points: StoryPoints::ONE,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Join row: the score of one task on one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskScore {
    pub task_id: TaskId,
    pub dimension_id: DimensionId,
    pub score: TaskScoreLevel,
}

/// Scores of one task keyed by dimension. Missing entries read as unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskScores(pub BTreeMap<DimensionId, TaskScoreLevel>);

impl TaskScores {
    pub fn get(&self, dimension_id: DimensionId) -> TaskScoreLevel {
        self.0.get(&dimension_id).copied().unwrap_or_default()
    }

    pub fn set(&mut self, dimension_id: DimensionId, score: TaskScoreLevel) {
        self.0.insert(dimension_id, score);
    }

    /// Group join rows by task.
    pub fn group(rows: &[TaskScore]) -> BTreeMap<TaskId, TaskScores> {
        let mut grouped: BTreeMap<TaskId, TaskScores> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.task_id)
                .or_default()
                .set(row.dimension_id, row.score);
        }
        grouped
    }
}

/// Derived read view of an epic: the record plus its computed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpicPriorityView {
    #[serde(flatten)]
    pub epic: Epic,
    pub value: f64,
    pub total_effort: u32,
    pub priority: f64,
    pub gate_count: u32,
}

/// Derived read view of a task with its scores and computed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPriorityView {
    #[serde(flatten)]
    pub task: Task,
    pub scores: TaskScores,
    pub value: f64,
    pub priority: f64,
}
