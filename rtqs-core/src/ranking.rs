//! Ranked list contracts
//!
//! Ordering and classification use authoritative rows only. Pending edits
//! never reach these functions, so typing into a form cannot reshuffle the list.

use crate::{
    epic_is_prioritized, task_is_prioritized, CoefficientTable, EpicPriorityView, EpicStatus,
    TaskPriorityView,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Epics split by status, each list in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedEpics {
    pub prioritized: Vec<EpicPriorityView>,
    pub unprioritized: Vec<EpicPriorityView>,
    pub proposed: Vec<EpicPriorityView>,
}

/// Tasks split by the prioritization predicate, each list in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedTasks {
    pub prioritized: Vec<TaskPriorityView>,
    pub unprioritized: Vec<TaskPriorityView>,
}

/// `(priority DESC, updated_at DESC)`.
pub fn cmp_prioritized_epics(a: &EpicPriorityView, b: &EpicPriorityView) -> Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| b.epic.updated_at.cmp(&a.epic.updated_at))
}

/// `(gate DESC, priority DESC, updated_at DESC)`.
pub fn cmp_prioritized_tasks(a: &TaskPriorityView, b: &TaskPriorityView) -> Ordering {
    b.task
        .gate
        .cmp(&a.task.gate)
        .then_with(|| b.priority.total_cmp(&a.priority))
        .then_with(|| b.task.updated_at.cmp(&a.task.updated_at))
}

/// Split epics by their stored status and sort each bucket.
pub fn rank_epics(views: impl IntoIterator<Item = EpicPriorityView>) -> RankedEpics {
    let mut ranked = RankedEpics::default();
    for view in views {
        match view.epic.status {
            EpicStatus::Proposed => ranked.proposed.push(view),
            EpicStatus::Prioritized => ranked.prioritized.push(view),
            EpicStatus::Unprioritized => ranked.unprioritized.push(view),
        }
    }
    ranked.prioritized.sort_by(cmp_prioritized_epics);
    ranked
        .unprioritized
        .sort_by(|a, b| b.epic.created_at.cmp(&a.epic.created_at));
    ranked
        .proposed
        .sort_by(|a, b| b.epic.created_at.cmp(&a.epic.created_at));
    ranked
}

/// Split tasks by the authoritative predicate and sort each bucket.
pub fn rank_tasks(
    views: impl IntoIterator<Item = TaskPriorityView>,
    table: &CoefficientTable,
) -> RankedTasks {
    let mut ranked = RankedTasks::default();
    for view in views {
        if task_is_prioritized(&view.scores, table, view.task.points.get()) {
            ranked.prioritized.push(view);
        } else {
            ranked.unprioritized.push(view);
        }
    }
    ranked.prioritized.sort_by(cmp_prioritized_tasks);
    ranked
        .unprioritized
        .sort_by(|a, b| b.task.created_at.cmp(&a.task.created_at));
    ranked
}

/// Whether a view satisfies the epic predicate on its own columns.
pub fn epic_view_is_prioritized(view: &EpicPriorityView) -> bool {
    epic_is_prioritized(&view.epic.scores, view.total_effort)
}
