//! Priority engine
//!
//! Pure functions mapping raw dimension scores, coefficients and effort to
//! `(value, priority, prioritized)`. The record store's derived views and the
//! local fallback both go through [`derive_epic_view`] / [`derive_task_view`],
//! so the two computation sites cannot drift apart.

use crate::{
    Dimension, DimensionId, EntityType, Epic, EpicPriorityView, EpicScores, RecordRef,
    RtqsDimension, Story, Task, TaskPriorityView, TaskScores,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weight used for any dimension absent from the loaded set.
pub const DEFAULT_COEFFICIENT: f64 = 1.0;

// ============================================================================
// COEFFICIENTS
// ============================================================================

/// Coefficients of the active dimensions, with a total lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoefficientTable {
    active: Vec<Dimension>,
    by_id: HashMap<DimensionId, f64>,
    by_name: HashMap<String, f64>,
}

impl CoefficientTable {
    /// Build from a dimension list; inactive entries are ignored.
    /// The order of `dimensions` is kept for [`CoefficientTable::active`].
    pub fn from_dimensions(dimensions: &[Dimension]) -> Self {
        let active: Vec<Dimension> = dimensions.iter().filter(|d| d.is_active).cloned().collect();
        let by_id = active
            .iter()
            .map(|d| (d.dimension_id, d.coefficient))
            .collect();
        let by_name = active
            .iter()
            .map(|d| (d.name.clone(), d.coefficient))
            .collect();
        Self {
            active,
            by_id,
            by_name,
        }
    }

    /// Active dimensions in registry order.
    pub fn active(&self) -> &[Dimension] {
        &self.active
    }

    /// Coefficient of a dimension, or [`DEFAULT_COEFFICIENT`] when it is not loaded.
    pub fn coefficient_of(&self, dimension_id: DimensionId) -> f64 {
        self.by_id
            .get(&dimension_id)
            .copied()
            .unwrap_or(DEFAULT_COEFFICIENT)
    }

    /// Coefficient by canonical name, or [`DEFAULT_COEFFICIENT`].
    pub fn coefficient_of_name(&self, name: &str) -> f64 {
        self.by_name
            .get(name)
            .copied()
            .unwrap_or(DEFAULT_COEFFICIENT)
    }

    /// Weights for the four epic dimensions.
    pub fn epic_weights(&self) -> [(RtqsDimension, f64); 4] {
        RtqsDimension::ALL.map(|d| (d, self.coefficient_of_name(d.as_str())))
    }

    /// Weights for the active task dimensions, in registry order.
    pub fn task_weights(&self) -> Vec<(DimensionId, f64)> {
        self.active
            .iter()
            .map(|d| (d.dimension_id, d.coefficient))
            .collect()
    }
}

// ============================================================================
// VALUE / PRIORITY
// ============================================================================

/// Anything carrying per-dimension scores.
pub trait Scoreable {
    type Key;

    /// Score on one dimension; unscored dimensions read as 0.
    fn score(&self, key: &Self::Key) -> f64;
}

impl Scoreable for EpicScores {
    type Key = RtqsDimension;

    fn score(&self, key: &RtqsDimension) -> f64 {
        f64::from(self.get(*key).get())
    }
}

impl Scoreable for TaskScores {
    type Key = DimensionId;

    fn score(&self, key: &DimensionId) -> f64 {
        f64::from(self.get(*key).get())
    }
}

/// Weighted sum of an item's scores: `Σ score(d) × coefficient(d)`.
pub fn compute_value<T: Scoreable + ?Sized>(item: &T, weights: &[(T::Key, f64)]) -> f64 {
    weights
        .iter()
        .map(|(key, coefficient)| item.score(key) * coefficient)
        .sum()
}

/// `value / effort`, or exactly `0.0` when effort is not strictly positive.
pub fn compute_priority(value: f64, effort: f64) -> f64 {
    if effort > 0.0 {
        value / effort
    } else {
        0.0
    }
}

/// Strict-positivity predicate: every listed dimension score and the effort are `> 0`.
pub fn is_prioritized<'a, T, I>(item: &T, keys: I, effort: f64) -> bool
where
    T: Scoreable + ?Sized,
    T::Key: 'a,
    I: IntoIterator<Item = &'a T::Key>,
{
    effort > 0.0 && keys.into_iter().all(|key| item.score(key) > 0.0)
}

/// Prioritization predicate for epics over their authoritative scores and effort.
pub fn epic_is_prioritized(scores: &EpicScores, total_effort: u32) -> bool {
    is_prioritized(scores, RtqsDimension::ALL.iter(), f64::from(total_effort))
}

/// Prioritization predicate for tasks over the active dimensions.
pub fn task_is_prioritized(scores: &TaskScores, table: &CoefficientTable, points: u32) -> bool {
    let keys: Vec<DimensionId> = table.active().iter().map(|d| d.dimension_id).collect();
    is_prioritized(scores, keys.iter(), f64::from(points))
}

/// Sum of points over official stories. Proposed stories do not count.
pub fn epic_effort<'a>(stories: impl IntoIterator<Item = &'a Story>) -> u32 {
    stories
        .into_iter()
        .filter(|s| s.is_official())
        .map(|s| s.points.get())
        .sum()
}

/// Number of official gate stories.
pub fn gate_count<'a>(stories: impl IntoIterator<Item = &'a Story>) -> u32 {
    stories
        .into_iter()
        .filter(|s| s.is_official() && s.gate)
        .count() as u32
}

// ============================================================================
// DERIVED VIEWS
// ============================================================================

/// Compute the epic priority view row. `stories` may contain other epics'
/// stories; only children of `epic` are used.
pub fn derive_epic_view(epic: &Epic, stories: &[Story], table: &CoefficientTable) -> EpicPriorityView {
    let children: Vec<&Story> = stories.iter().filter(|s| s.epic_id == epic.epic_id).collect();
    let total_effort = epic_effort(children.iter().copied());
    let value = compute_value(&epic.scores, &table.epic_weights());
    EpicPriorityView {
        epic: epic.clone(),
        value,
        total_effort,
        priority: compute_priority(value, f64::from(total_effort)),
        gate_count: gate_count(children.iter().copied()),
    }
}

/// Compute the task priority view row.
pub fn derive_task_view(task: &Task, scores: &TaskScores, table: &CoefficientTable) -> TaskPriorityView {
    let value = compute_value(scores, &table.task_weights());
    TaskPriorityView {
        task: task.clone(),
        scores: scores.clone(),
        value,
        priority: compute_priority(value, f64::from(task.points.get())),
    }
}

/// A computed column on which the store's view and the local engine disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDivergence {
    pub record: RecordRef,
    pub column: String,
    pub store_value: f64,
    pub local_value: f64,
}

fn diverges(a: f64, b: f64, tolerance: f64) -> bool {
    !((a - b).abs() <= tolerance)
}

/// Compare a store-provided epic row against the local derivation.
pub fn compare_epic_views(
    store: &EpicPriorityView,
    local: &EpicPriorityView,
    tolerance: f64,
) -> Vec<ViewDivergence> {
    let record = RecordRef::new(EntityType::Epic, store.epic.epic_id);
    let columns = [
        ("value", store.value, local.value),
        (
            "total_effort",
            f64::from(store.total_effort),
            f64::from(local.total_effort),
        ),
        ("priority", store.priority, local.priority),
        (
            "gate_count",
            f64::from(store.gate_count),
            f64::from(local.gate_count),
        ),
    ];
    columns
        .into_iter()
        .filter(|(_, s, l)| diverges(*s, *l, tolerance))
        .map(|(column, store_value, local_value)| ViewDivergence {
            record,
            column: column.to_string(),
            store_value,
            local_value,
        })
        .collect()
}

/// Compare a store-provided task row against the local derivation.
pub fn compare_task_views(
    store: &TaskPriorityView,
    local: &TaskPriorityView,
    tolerance: f64,
) -> Vec<ViewDivergence> {
    let record = RecordRef::new(EntityType::Task, store.task.task_id);
    [
        ("value", store.value, local.value),
        ("priority", store.priority, local.priority),
    ]
    .into_iter()
    .filter(|(_, s, l)| diverges(*s, *l, tolerance))
    .map(|(column, store_value, local_value)| ViewDivergence {
        record,
        column: column.to_string(),
        store_value,
        local_value,
    })
    .collect()
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
