//! RTQS Test Utilities
//!
//! Shared test infrastructure for the RTQS workspace:
//! - Proptest generators for records and scores
//! - A store wrapper that yields before writes, for interleaving tests
//! - Fixtures for the standard R/T/Q/S setup
//! - Assertions for the error taxonomy

pub use rtqs_storage::{FailurePoint, MockRecordStore, RecordStore};

pub use rtqs_core::{
    BatchError, Dimension, DimensionId, EntityType, Epic, EpicId, EpicPriorityView, EpicScores,
    EpicStatus, RecordRef, RtqsDimension, RtqsError, RtqsResult, Score, StorageError, Story,
    StoryId, StoryPoints, StoryStatus, Task, TaskId, TaskPriorityView, TaskScore, TaskScoreLevel,
    Timestamp, ValidationError,
};

use ::async_trait::async_trait;
use rtqs_storage::{
    DimensionFilter, DimensionUpdate, EpicUpdate, StoryFilter, StoryUpdate, TaskUpdate,
};
use std::sync::Arc;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call from every
/// test; only the first call installs anything.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

// ============================================================================
// YIELDING STORE
// ============================================================================

/// Delegates to an inner store but yields to the runtime before each epic
/// and task update, so two confirms joined on one task interleave.
#[derive(Debug)]
pub struct YieldingStore<S> {
    inner: Arc<S>,
}

impl<S: RecordStore> YieldingStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for YieldingStore<S> {
    async fn dimension_list(&self, filter: DimensionFilter) -> RtqsResult<Vec<Dimension>> {
        self.inner.dimension_list(filter).await
    }

    async fn dimension_insert(&self, d: &Dimension) -> RtqsResult<()> {
        self.inner.dimension_insert(d).await
    }

    async fn dimension_update(&self, id: DimensionId, update: DimensionUpdate) -> RtqsResult<()> {
        self.inner.dimension_update(id, update).await
    }

    async fn dimension_delete(&self, id: DimensionId) -> RtqsResult<()> {
        self.inner.dimension_delete(id).await
    }

    async fn epic_list(&self) -> RtqsResult<Vec<Epic>> {
        self.inner.epic_list().await
    }

    async fn epic_get(&self, id: EpicId) -> RtqsResult<Option<Epic>> {
        self.inner.epic_get(id).await
    }

    async fn epic_insert(&self, e: &Epic) -> RtqsResult<()> {
        self.inner.epic_insert(e).await
    }

    async fn epic_update(&self, id: EpicId, update: EpicUpdate) -> RtqsResult<()> {
        tokio::task::yield_now().await;
        self.inner.epic_update(id, update).await
    }

    async fn epic_delete(&self, id: EpicId) -> RtqsResult<()> {
        self.inner.epic_delete(id).await
    }

    async fn epic_priority_view(&self) -> RtqsResult<Vec<EpicPriorityView>> {
        self.inner.epic_priority_view().await
    }

    async fn story_list(&self, filter: StoryFilter) -> RtqsResult<Vec<Story>> {
        self.inner.story_list(filter).await
    }

    async fn story_insert(&self, s: &Story) -> RtqsResult<()> {
        self.inner.story_insert(s).await
    }

    async fn story_update(&self, id: StoryId, update: StoryUpdate) -> RtqsResult<()> {
        self.inner.story_update(id, update).await
    }

    async fn story_delete(&self, id: StoryId) -> RtqsResult<()> {
        self.inner.story_delete(id).await
    }

    async fn task_list(&self) -> RtqsResult<Vec<Task>> {
        self.inner.task_list().await
    }

    async fn task_insert(&self, t: &Task) -> RtqsResult<()> {
        self.inner.task_insert(t).await
    }

    async fn task_update(&self, id: TaskId, update: TaskUpdate) -> RtqsResult<()> {
        tokio::task::yield_now().await;
        self.inner.task_update(id, update).await
    }

    async fn task_delete(&self, id: TaskId) -> RtqsResult<()> {
        self.inner.task_delete(id).await
    }

    async fn task_score_list(&self) -> RtqsResult<Vec<TaskScore>> {
        self.inner.task_score_list().await
    }

    async fn task_score_upsert(&self, score: &TaskScore) -> RtqsResult<()> {
        self.inner.task_score_upsert(score).await
    }

    async fn task_priority_view(&self) -> RtqsResult<Vec<TaskPriorityView>> {
        self.inner.task_priority_view().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for RTQS records.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_epic_id() -> impl Strategy<Value = EpicId> {
        arb_uuid().prop_map(EpicId::new)
    }

    pub fn arb_dimension_id() -> impl Strategy<Value = DimensionId> {
        arb_uuid().prop_map(DimensionId::new)
    }

    /// Any score, unset included.
    pub fn arb_score() -> impl Strategy<Value = Score> {
        (0..=Score::MAX).prop_map(|v| Score::new(v).unwrap())
    }

    pub fn arb_story_points() -> impl Strategy<Value = StoryPoints> {
        prop::sample::select(StoryPoints::ALLOWED.to_vec())
            .prop_map(|v| StoryPoints::new(v).unwrap())
    }

    pub fn arb_task_score_level() -> impl Strategy<Value = TaskScoreLevel> {
        prop_oneof![
            Just(TaskScoreLevel::Unset),
            Just(TaskScoreLevel::Low),
            Just(TaskScoreLevel::Medium),
            Just(TaskScoreLevel::High),
        ]
    }

    pub fn arb_epic_scores() -> impl Strategy<Value = EpicScores> {
        (arb_score(), arb_score(), arb_score(), arb_score())
            .prop_map(|(r, t, q, s)| EpicScores::new(r, t, q, s))
    }

    /// Coefficients on a 0.05 grid in `[0, 5]`.
    pub fn arb_coefficient() -> impl Strategy<Value = f64> {
        (0u32..=100).prop_map(|n| f64::from(n) * 0.05)
    }

    pub fn arb_epic() -> impl Strategy<Value = Epic> {
        ("[A-Za-z ]{1,24}", arb_epic_scores(), any::<bool>()).prop_map(|(title, scores, proposed)| {
            let status = if proposed {
                EpicStatus::Proposed
            } else {
                EpicStatus::Unprioritized
            };
            let mut epic = Epic::new(title, None, status);
            epic.scores = scores;
            epic
        })
    }

    /// Stories for one epic with dense `order_index` values.
    pub fn arb_stories(epic_id: EpicId, max: usize) -> impl Strategy<Value = Vec<Story>> {
        prop::collection::vec((arb_story_points(), any::<bool>(), any::<bool>()), 0..=max).prop_map(
            move |rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (points, gate, proposed))| {
                        let status = if proposed {
                            StoryStatus::Proposed
                        } else {
                            StoryStatus::Official
                        };
                        let mut story =
                            Story::new(epic_id, format!("Story {}", i), i as i32, status);
                        story.points = points;
                        story.gate = gate;
                        story
                    })
                    .collect()
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.

    use super::*;

    /// The four epic dimensions with the given coefficients, in R/T/Q/S order.
    pub fn rtqs_dimensions(coefficients: [f64; 4]) -> Vec<Dimension> {
        RtqsDimension::ALL
            .iter()
            .zip(coefficients)
            .enumerate()
            .map(|(i, (dim, coefficient))| Dimension::new(dim.as_str(), coefficient, i as i32 + 1))
            .collect()
    }

    /// An official epic with the given R, T, Q, S scores.
    pub fn scored_epic(title: &str, scores: [u8; 4]) -> Epic {
        let [r, t, q, s] = scores.map(|v| Score::new(v).unwrap());
        let mut epic = Epic::new(title, None, EpicStatus::Unprioritized);
        epic.scores = EpicScores::new(r, t, q, s);
        epic
    }

    pub fn official_story(epic_id: EpicId, order_index: i32, points: u32) -> Story {
        let mut story = Story::new(
            epic_id,
            format!("Story {}", order_index),
            order_index,
            StoryStatus::Official,
        );
        story.points = StoryPoints::new(points).unwrap();
        story
    }

    /// A mock store holding the R/T/Q/S dimensions, all with coefficient 1.
    pub async fn seeded_store() -> Arc<MockRecordStore> {
        seeded_store_with([1.0; 4]).await
    }

    pub async fn seeded_store_with(coefficients: [f64; 4]) -> Arc<MockRecordStore> {
        let store = Arc::new(MockRecordStore::new());
        for dimension in rtqs_dimensions(coefficients) {
            store.dimension_insert(&dimension).await.unwrap();
        }
        store
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over the RTQS error taxonomy.

    use super::*;

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &RtqsResult<T>) {
        match result {
            Err(RtqsError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_unknown_record<T: std::fmt::Debug>(result: &RtqsResult<T>, entity_type: EntityType) {
        match result {
            Err(RtqsError::Validation(ValidationError::UnknownRecord { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in UnknownRecord error");
            }
            other => panic!("Expected UnknownRecord for {:?}, got: {:?}", entity_type, other),
        }
    }

    #[track_caller]
    pub fn assert_write_failure<T: std::fmt::Debug>(result: &RtqsResult<T>) {
        match result {
            Err(RtqsError::Batch(BatchError::WriteFailure { .. })) => {}
            other => panic!("Expected WriteFailure, got: {:?}", other),
        }
    }

    /// Assert a partial batch failure after exactly `committed` writes landed.
    #[track_caller]
    pub fn assert_partial_batch<T: std::fmt::Debug>(result: &RtqsResult<T>, committed: usize) {
        match result {
            Err(RtqsError::Batch(BatchError::PartialBatchFailure { committed: c, .. })) => {
                assert_eq!(*c, committed, "Wrong committed count in PartialBatchFailure");
            }
            other => panic!("Expected PartialBatchFailure, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
