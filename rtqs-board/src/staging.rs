//! Pending-edit overlay
//!
//! Authoritative rows and pending edits live in separate maps. Edits are
//! merged onto a copy of the authoritative row on read and never written
//! into it, so "what changed" is always recoverable for dirty tracking and
//! for building the confirm payload.

use rtqs_core::{
    DimensionId, Epic, EpicStatus, RtqsDimension, RtqsResult, Score, Story, StoryPoints,
    TaskPriorityView, TaskScoreLevel, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

// ============================================================================
// FIELD EDITS
// ============================================================================

/// A single field-level change to a record of type `Record`.
pub trait FieldEdit: Clone + Debug {
    type Field: Copy + Ord + Debug;
    type Record;

    /// The field this edit targets. Two edits with the same field overwrite
    /// each other.
    fn field(&self) -> Self::Field;

    /// The record's current value of `field`, as an edit.
    fn read(record: &Self::Record, field: Self::Field) -> Self;

    /// Write this edit into `record`.
    fn apply(&self, record: &mut Self::Record);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EpicField {
    Title,
    Link,
    Score(RtqsDimension),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EpicEdit {
    Title(String),
    Link(Option<String>),
    Score(RtqsDimension, Score),
}

impl FieldEdit for EpicEdit {
    type Field = EpicField;
    type Record = Epic;

    fn field(&self) -> EpicField {
        match self {
            EpicEdit::Title(_) => EpicField::Title,
            EpicEdit::Link(_) => EpicField::Link,
            EpicEdit::Score(d, _) => EpicField::Score(*d),
        }
    }

    fn read(epic: &Epic, field: EpicField) -> Self {
        match field {
            EpicField::Title => EpicEdit::Title(epic.title.clone()),
            EpicField::Link => EpicEdit::Link(epic.link.clone()),
            EpicField::Score(d) => EpicEdit::Score(d, epic.scores.get(d)),
        }
    }

    fn apply(&self, epic: &mut Epic) {
        match self {
            EpicEdit::Title(title) => epic.title = title.clone(),
            EpicEdit::Link(link) => epic.link = link.clone(),
            EpicEdit::Score(d, score) => epic.scores.set(*d, *score),
        }
    }
}

impl EpicEdit {
    /// Parse raw form input for `field`. Malformed input is rejected before
    /// it can become a pending edit.
    pub fn parse(field: EpicField, input: &str) -> RtqsResult<Self> {
        Ok(match field {
            EpicField::Title => EpicEdit::Title(input.to_string()),
            EpicField::Link => EpicEdit::Link(parse_link(input)),
            EpicField::Score(d) => EpicEdit::Score(d, input.parse()?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoryField {
    Title,
    Link,
    Points,
    Gate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoryEdit {
    Title(String),
    Link(Option<String>),
    Points(StoryPoints),
    Gate(bool),
}

impl FieldEdit for StoryEdit {
    type Field = StoryField;
    type Record = Story;

    fn field(&self) -> StoryField {
        match self {
            StoryEdit::Title(_) => StoryField::Title,
            StoryEdit::Link(_) => StoryField::Link,
            StoryEdit::Points(_) => StoryField::Points,
            StoryEdit::Gate(_) => StoryField::Gate,
        }
    }

    fn read(story: &Story, field: StoryField) -> Self {
        match field {
            StoryField::Title => StoryEdit::Title(story.title.clone()),
            StoryField::Link => StoryEdit::Link(story.link.clone()),
            StoryField::Points => StoryEdit::Points(story.points),
            StoryField::Gate => StoryEdit::Gate(story.gate),
        }
    }

    fn apply(&self, story: &mut Story) {
        match self {
            StoryEdit::Title(title) => story.title = title.clone(),
            StoryEdit::Link(link) => story.link = link.clone(),
            StoryEdit::Points(points) => story.points = *points,
            StoryEdit::Gate(gate) => story.gate = *gate,
        }
    }
}

impl StoryEdit {
    pub fn parse(field: StoryField, input: &str) -> RtqsResult<Self> {
        Ok(match field {
            StoryField::Title => StoryEdit::Title(input.to_string()),
            StoryField::Link => StoryEdit::Link(parse_link(input)),
            StoryField::Points => StoryEdit::Points(input.parse()?),
            StoryField::Gate => StoryEdit::Gate(parse_flag("gate", input)?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskField {
    Title,
    Link,
    Points,
    Gate,
    Score(DimensionId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskEdit {
    Title(String),
    Link(Option<String>),
    Points(StoryPoints),
    Gate(bool),
    Score(DimensionId, TaskScoreLevel),
}

impl FieldEdit for TaskEdit {
    type Field = TaskField;
    type Record = TaskPriorityView;

    fn field(&self) -> TaskField {
        match self {
            TaskEdit::Title(_) => TaskField::Title,
            TaskEdit::Link(_) => TaskField::Link,
            TaskEdit::Points(_) => TaskField::Points,
            TaskEdit::Gate(_) => TaskField::Gate,
            TaskEdit::Score(d, _) => TaskField::Score(*d),
        }
    }

    fn read(view: &TaskPriorityView, field: TaskField) -> Self {
        match field {
            TaskField::Title => TaskEdit::Title(view.task.title.clone()),
            TaskField::Link => TaskEdit::Link(view.task.link.clone()),
            TaskField::Points => TaskEdit::Points(view.task.points),
            TaskField::Gate => TaskEdit::Gate(view.task.gate),
            TaskField::Score(d) => TaskEdit::Score(d, view.scores.get(d)),
        }
    }

    fn apply(&self, view: &mut TaskPriorityView) {
        match self {
            TaskEdit::Title(title) => view.task.title = title.clone(),
            TaskEdit::Link(link) => view.task.link = link.clone(),
            TaskEdit::Points(points) => view.task.points = *points,
            TaskEdit::Gate(gate) => view.task.gate = *gate,
            TaskEdit::Score(d, level) => view.scores.set(*d, *level),
        }
    }
}

impl TaskEdit {
    pub fn parse(field: TaskField, input: &str) -> RtqsResult<Self> {
        Ok(match field {
            TaskField::Title => TaskEdit::Title(input.to_string()),
            TaskField::Link => TaskEdit::Link(parse_link(input)),
            TaskField::Points => TaskEdit::Points(input.parse()?),
            TaskField::Gate => TaskEdit::Gate(parse_flag("gate", input)?),
            TaskField::Score(d) => TaskEdit::Score(d, input.parse()?),
        })
    }
}

/// An empty link clears it.
fn parse_link(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_flag(field: &str, input: &str) -> RtqsResult<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}' is not a boolean", input),
        }
        .into()),
    }
}

// ============================================================================
// PENDING EDITS
// ============================================================================

/// Pending edits keyed by record id, then by field.
#[derive(Debug, Clone)]
pub struct PendingEdits<I, E: FieldEdit> {
    edits: HashMap<I, BTreeMap<E::Field, E>>,
}

impl<I, E: FieldEdit> Default for PendingEdits<I, E> {
    fn default() -> Self {
        Self {
            edits: HashMap::new(),
        }
    }
}

impl<I: Copy + Eq + Hash, E: FieldEdit> PendingEdits<I, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite the pending value of the edit's field.
    pub fn set(&mut self, id: I, edit: E) {
        self.edits.entry(id).or_default().insert(edit.field(), edit);
    }

    pub fn get(&self, id: I, field: E::Field) -> Option<&E> {
        self.edits.get(&id).and_then(|fields| fields.get(&field))
    }

    /// Pending edits of one record in field order.
    pub fn edits(&self, id: I) -> impl Iterator<Item = &E> {
        self.edits.get(&id).into_iter().flat_map(|fields| fields.values())
    }

    pub fn is_dirty(&self, id: I) -> bool {
        self.edits.get(&id).is_some_and(|fields| !fields.is_empty())
    }

    /// Drop every pending edit of `id`, returning how many there were.
    pub fn clear(&mut self, id: I) -> usize {
        self.edits.remove(&id).map_or(0, |fields| fields.len())
    }

    /// Copy of the pending edits of `id`, as handed to a confirm.
    pub fn snapshot(&self, id: I) -> Vec<E> {
        self.edits(id).cloned().collect()
    }

    /// Drop the edits of `id` that still hold the value in `flushed`. A field
    /// restaged since the snapshot was taken stays pending. Returns how many
    /// edits were dropped.
    pub fn clear_flushed(&mut self, id: I, flushed: &[E]) -> usize
    where
        E: PartialEq,
    {
        let Some(fields) = self.edits.get_mut(&id) else {
            return 0;
        };
        let before = fields.len();
        for edit in flushed {
            if fields.get(&edit.field()) == Some(edit) {
                fields.remove(&edit.field());
            }
        }
        let cleared = before - fields.len();
        if fields.is_empty() {
            self.edits.remove(&id);
        }
        cleared
    }

    /// Drop edits of records for which `keep` is false.
    pub fn retain(&mut self, mut keep: impl FnMut(&I) -> bool) {
        self.edits.retain(|id, _| keep(id));
    }

    pub fn dirty_ids(&self) -> impl Iterator<Item = &I> {
        self.edits
            .iter()
            .filter(|(_, fields)| !fields.is_empty())
            .map(|(id, _)| id)
    }

    /// `get` with fallback to the authoritative record.
    pub fn display_value(&self, id: I, record: &E::Record, field: E::Field) -> E {
        self.get(id, field)
            .cloned()
            .unwrap_or_else(|| E::read(record, field))
    }

    /// A copy of `record` with every pending edit of `id` applied.
    pub fn overlay(&self, id: I, record: &E::Record) -> E::Record
    where
        E::Record: Clone,
    {
        let mut merged = record.clone();
        for edit in self.edits(id) {
            edit.apply(&mut merged);
        }
        merged
    }
}

// ============================================================================
// STAGE STATE
// ============================================================================

/// Per-item staging state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
    /// No pending edits
    #[default]
    Clean,
    /// At least one pending edit held in memory
    Dirty,
    /// A confirm is writing to the store
    Flushing,
}

impl StageState {
    pub fn from_flags(dirty: bool, flushing: bool) -> Self {
        match (flushing, dirty) {
            (true, _) => StageState::Flushing,
            (false, true) => StageState::Dirty,
            (false, false) => StageState::Clean,
        }
    }
}

/// Ids with a confirm in flight.
#[derive(Debug, Clone)]
pub struct FlushSet<I> {
    flushing: HashSet<I>,
}

impl<I> Default for FlushSet<I> {
    fn default() -> Self {
        Self {
            flushing: HashSet::new(),
        }
    }
}

impl<I: Copy + Eq + Hash> FlushSet<I> {
    /// Mark `id` as flushing. False when it already was.
    pub fn begin(&mut self, id: I) -> bool {
        self.flushing.insert(id)
    }

    pub fn finish(&mut self, id: I) {
        self.flushing.remove(&id);
    }

    pub fn contains(&self, id: I) -> bool {
        self.flushing.contains(&id)
    }
}

/// Result of a confirm request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmOutcome {
    /// Every write landed and pending edits were cleared
    Confirmed {
        writes: usize,
        /// New epic status when the confirm moved the epic between lists
        status_change: Option<EpicStatus>,
    },
    /// Nothing was pending; no write was issued
    NothingToConfirm,
    /// A confirm for the same item is still outstanding; ignored
    AlreadyFlushing,
}
