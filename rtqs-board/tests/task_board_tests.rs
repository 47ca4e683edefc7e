//! Task board and coefficient registry against the in-memory record store.

use rtqs_board::{
    ConfirmOutcome, DimensionInput, StageState, TaskBoard, TaskEdit, TaskField, ViewSource,
};
use rtqs_core::{
    DashboardConfig, DimensionId, EntityType, MoveDirection, NamePolicy, StoryPoints,
    TaskScoreLevel,
};
use rtqs_test_utils::{
    assertions, fixtures, init_tracing, FailurePoint, MockRecordStore, YieldingStore,
};
use std::sync::Arc;

async fn task_board(
    dimensions: &[(&str, f64)],
) -> (Arc<MockRecordStore>, TaskBoard<MockRecordStore>, Vec<DimensionId>) {
    init_tracing();
    let store = Arc::new(MockRecordStore::new());
    let board = TaskBoard::new(store.clone(), DashboardConfig::default());
    let mut ids = Vec::new();
    for (name, coefficient) in dimensions {
        let d = board
            .registry()
            .upsert(DimensionInput::new(*name, *coefficient))
            .await
            .unwrap();
        ids.push(d.dimension_id);
    }
    board.load().await.unwrap();
    (store, board, ids)
}

// ============================================================================
// TASK BOARD
// ============================================================================

#[tokio::test]
async fn test_gate_tasks_rank_first() {
    let (_, board, dims) = task_board(&[("Impact", 2.0)]).await;
    assert_eq!(board.registry().policy(), NamePolicy::FreeForm);
    let plain = board.create_task("Plain", None).await.unwrap();
    let gated = board.create_task("Gated", None).await.unwrap();

    board.set_task_field(plain, TaskEdit::Score(dims[0], TaskScoreLevel::High)).unwrap();
    board.confirm(plain).await.unwrap();
    board.set_task_field(gated, TaskEdit::Score(dims[0], TaskScoreLevel::Low)).unwrap();
    board.set_task_field(gated, TaskEdit::Gate(true)).unwrap();
    board.confirm(gated).await.unwrap();

    let ranked = board.snapshot().unwrap().ranked;
    let order: Vec<_> = ranked.prioritized.iter().map(|v| v.task.task_id).collect();
    assert_eq!(order, vec![gated, plain]);
    assert_eq!(ranked.prioritized[1].value, 10.0);
}

#[tokio::test]
async fn test_deactivated_dimension_drops_out_of_value() {
    let (_, board, dims) = task_board(&[("Impact", 1.0), ("Urgency", 1.0)]).await;
    let task = board.create_task("Fix login", None).await.unwrap();
    board.set_task_field(task, TaskEdit::Score(dims[0], TaskScoreLevel::Medium)).unwrap();
    board.confirm(task).await.unwrap();
    assert!(board.snapshot().unwrap().ranked.prioritized.is_empty());

    board.registry().set_active(dims[1], false).await.unwrap();
    board.load().await.unwrap();
    let ranked = board.snapshot().unwrap().ranked;
    assert_eq!(ranked.prioritized.len(), 1);
    assert_eq!(ranked.prioritized[0].value, 3.0);

    let result = board.set_task_field(task, TaskEdit::Score(dims[1], TaskScoreLevel::High));
    assertions::assert_unknown_record(&result, EntityType::Dimension);
}

#[tokio::test]
async fn test_first_task_write_failure() {
    let (store, board, _) = task_board(&[]).await;
    let task = board.create_task("Fix login", None).await.unwrap();
    board
        .set_task_field(task, TaskEdit::Points(StoryPoints::new(3).unwrap()))
        .unwrap();
    store.fail_on(FailurePoint::update(EntityType::Task)).unwrap();

    let result = board.confirm(task).await;
    assertions::assert_write_failure(&result);
    assert_eq!(board.stage_state(task).unwrap(), StageState::Dirty);
    assert_eq!(
        board.display_value(task, TaskField::Points).unwrap(),
        TaskEdit::Points(StoryPoints::new(3).unwrap())
    );
}

#[tokio::test]
async fn test_task_confirm_while_flushing_is_ignored() {
    init_tracing();
    let inner = Arc::new(MockRecordStore::new());
    let board = TaskBoard::new(
        Arc::new(YieldingStore::new(inner.clone())),
        DashboardConfig::default(),
    );
    board.load().await.unwrap();
    let task = board.create_task("Fix login", None).await.unwrap();
    board.set_task_field(task, TaskEdit::Title("Fix SSO".to_string())).unwrap();

    let (first, second) = tokio::join!(board.confirm(task), board.confirm(task));
    assert!(matches!(first.unwrap(), ConfirmOutcome::Confirmed { writes: 1, .. }));
    assert_eq!(second.unwrap(), ConfirmOutcome::AlreadyFlushing);
}

#[tokio::test]
async fn test_task_edits_staged_during_confirm_stay_pending() {
    init_tracing();
    let inner = Arc::new(MockRecordStore::new());
    let board = TaskBoard::new(
        Arc::new(YieldingStore::new(inner.clone())),
        DashboardConfig::default(),
    );
    board.load().await.unwrap();
    let task = board.create_task("Fix login", None).await.unwrap();
    board.set_task_field(task, TaskEdit::Title("Fix SSO".to_string())).unwrap();

    let (first, _) = tokio::join!(board.confirm(task), async {
        assert_eq!(board.stage_state(task).unwrap(), StageState::Flushing);
        board
            .set_task_field(task, TaskEdit::Points(StoryPoints::new(3).unwrap()))
            .unwrap();
    });
    assert!(matches!(first.unwrap(), ConfirmOutcome::Confirmed { writes: 1, .. }));
    assert_eq!(board.stage_state(task).unwrap(), StageState::Dirty);
    assert_eq!(
        board.display_value(task, TaskField::Points).unwrap(),
        TaskEdit::Points(StoryPoints::new(3).unwrap())
    );
    assert_eq!(
        board.display_value(task, TaskField::Title).unwrap(),
        TaskEdit::Title("Fix SSO".to_string())
    );

    board.confirm(task).await.unwrap();
    assert_eq!(board.stage_state(task).unwrap(), StageState::Clean);
    assert_eq!(board.display(task).unwrap().task.points.get(), 3);
}

#[tokio::test]
async fn test_task_view_divergence_reported() {
    let (store, board, dims) = task_board(&[("Impact", 1.0)]).await;
    let task = board.create_task("Fix login", None).await.unwrap();
    board.set_task_field(task, TaskEdit::Score(dims[0], TaskScoreLevel::High)).unwrap();
    board.confirm(task).await.unwrap();

    store.skew_priority_views(1.0).unwrap();
    board.load().await.unwrap();
    let snapshot = board.snapshot().unwrap();
    assert_eq!(snapshot.view_source, ViewSource::Store);
    assert_eq!(snapshot.divergences.len(), 1);
    assert_eq!(snapshot.ranked.prioritized[0].priority, 6.0);
}

// ============================================================================
// COEFFICIENT REGISTRY
// ============================================================================

#[tokio::test]
async fn test_rtqs_names_normalize_and_reject_duplicates() {
    init_tracing();
    let store = Arc::new(MockRecordStore::new());
    let registry = rtqs_board::CoefficientRegistry::new(store.clone(), NamePolicy::Rtqs);

    let r = registry.upsert(DimensionInput::new(" r ", 1.5)).await.unwrap();
    assert_eq!(r.name, "R");
    assert_eq!(r.sort_order, 1);

    let duplicate = registry.upsert(DimensionInput::new("R", 2.0)).await;
    assertions::assert_validation_error(&duplicate);
    let illegal = registry.upsert(DimensionInput::new("X", 2.0)).await;
    assertions::assert_validation_error(&illegal);
    assert_eq!(store.dimension_count().unwrap(), 1);

    let updated = registry
        .upsert(DimensionInput::existing(r.dimension_id, "r", 0.5))
        .await
        .unwrap();
    assert_eq!(updated.coefficient, 0.5);
    assert_eq!(registry.coefficients().unwrap().coefficient_of_name("R"), 0.5);
}

#[tokio::test]
async fn test_registry_reorder_over_seeded_dimensions() {
    init_tracing();
    let store = fixtures::seeded_store().await;
    let registry = rtqs_board::CoefficientRegistry::new(store, NamePolicy::Rtqs);
    let dims = registry.load().await.unwrap();
    assert_eq!(dims.len(), 4);

    assert!(registry.reorder(dims[2].dimension_id, MoveDirection::Up).await.unwrap());
    let names: Vec<String> = registry.list_all().unwrap().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["R", "Q", "T", "S"]);
    assert!(!registry.reorder(dims[0].dimension_id, MoveDirection::Up).await.unwrap());
}

#[test]
fn test_malformed_coefficient_rejected_before_write() {
    let result = DimensionInput::parse(None, "Impact", "1,5");
    assertions::assert_validation_error(&result);
}
