//! Epic board behaviour against the in-memory record store.
//!
//! Covers the staging overlay, confirm outcomes (success, write failure,
//! partial batch), story ordering, view fallback and the analytics report.

use rtqs_board::{
    ConfirmOutcome, EpicBoard, EpicEdit, EpicField, StageState, StoryEdit, StoryField, ViewSource,
};
use rtqs_core::{
    DashboardConfig, EntityType, EpicId, EpicStatus, MoveDirection, RtqsDimension, Score,
    StoryPoints,
};
use rtqs_test_utils::{
    assertions, fixtures, init_tracing, FailurePoint, MockRecordStore, RecordStore, YieldingStore,
};
use std::sync::Arc;

// ============================================================================
// HELPERS
// ============================================================================

async fn seeded_board() -> (Arc<MockRecordStore>, EpicBoard<MockRecordStore>) {
    init_tracing();
    let store = fixtures::seeded_store().await;
    let board = EpicBoard::new(store.clone(), DashboardConfig::default());
    board.load().await.unwrap();
    (store, board)
}

/// Insert a prioritized epic with one official story per entry of `points`.
async fn insert_prioritized(
    store: &MockRecordStore,
    title: &str,
    scores: [u8; 4],
    points: &[u32],
) -> EpicId {
    let mut epic = fixtures::scored_epic(title, scores);
    epic.status = EpicStatus::Prioritized;
    store.epic_insert(&epic).await.unwrap();
    for (i, p) in points.iter().enumerate() {
        store
            .story_insert(&fixtures::official_story(epic.epic_id, i as i32, *p))
            .await
            .unwrap();
    }
    epic.epic_id
}

fn score(v: u8) -> Score {
    Score::new(v).unwrap()
}

// ============================================================================
// STAGING OVERLAY
// ============================================================================

#[tokio::test]
async fn test_pending_score_shows_in_display_but_not_in_ranking() {
    let (store, board) = seeded_board().await;
    let a = insert_prioritized(&store, "Alpha", [2, 3, 3, 3], &[2]).await;
    let b = insert_prioritized(&store, "Beta", [3, 3, 3, 3], &[2]).await;
    board.load().await.unwrap();

    board
        .set_epic_field(a, EpicEdit::Score(RtqsDimension::R, score(4)))
        .unwrap();

    assert_eq!(
        board.display_value(a, EpicField::Score(RtqsDimension::R)).unwrap(),
        EpicEdit::Score(RtqsDimension::R, score(4))
    );
    let display = board.display(a).unwrap();
    assert_eq!(display.value, 13.0);
    assert_eq!(display.priority, 6.5);
    assert_eq!(display.state, StageState::Dirty);

    let ranked = board.snapshot().unwrap().ranked;
    let order: Vec<EpicId> = ranked.prioritized.iter().map(|v| v.epic.epic_id).collect();
    assert_eq!(order, vec![b, a]);
    assert_eq!(ranked.prioritized[1].epic.scores.r, score(2));
    assert_eq!(ranked.prioritized[1].priority, 5.5);

    let stored = store.epic_get(a).await.unwrap().unwrap();
    assert_eq!(stored.scores.r, score(2));
}

#[tokio::test]
async fn test_story_edit_marks_parent_dirty() {
    let (_, board) = seeded_board().await;
    let epic = board.create_epic("Billing", None).await.unwrap();
    let story = board.add_story(epic, false).await.unwrap();
    assert_eq!(board.stage_state(epic).unwrap(), StageState::Clean);

    board
        .set_story_field(story, StoryEdit::Points(StoryPoints::new(5).unwrap()))
        .unwrap();
    assert_eq!(board.stage_state(epic).unwrap(), StageState::Dirty);
    assert_eq!(
        board.story_display_value(story, StoryField::Points).unwrap(),
        StoryEdit::Points(StoryPoints::new(5).unwrap())
    );
    assert_eq!(board.story_points(story).unwrap().get(), 5);
    assert_eq!(board.stories(epic).unwrap()[0].points.get(), 1);
    assert_eq!(board.display(epic).unwrap().total_effort, 5);
}

// ============================================================================
// CONFIRM
// ============================================================================

#[tokio::test]
async fn test_confirm_promotes_epic_to_prioritized() {
    let (store, board) = seeded_board().await;
    let epic = board.create_epic("Billing", None).await.unwrap();
    let story = board.add_story(epic, false).await.unwrap();

    for dim in RtqsDimension::ALL {
        board.set_epic_field(epic, EpicEdit::Score(dim, score(3))).unwrap();
    }
    board
        .set_story_field(story, StoryEdit::Points(StoryPoints::new(8).unwrap()))
        .unwrap();

    let outcome = board.confirm(epic).await.unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Confirmed {
            writes: 3,
            status_change: Some(EpicStatus::Prioritized),
        }
    );
    assert_eq!(board.stage_state(epic).unwrap(), StageState::Clean);

    let ranked = board.snapshot().unwrap().ranked;
    assert_eq!(ranked.prioritized.len(), 1);
    assert_eq!(ranked.prioritized[0].value, 12.0);
    assert_eq!(ranked.prioritized[0].priority, 1.5);

    let stored = store.epic_get(epic).await.unwrap().unwrap();
    assert!(stored.is_confirmed);
    assert_eq!(stored.status, EpicStatus::Prioritized);
}

#[tokio::test]
async fn test_confirm_demotes_when_effort_drops_to_zero() {
    let (store, board) = seeded_board().await;
    let epic = insert_prioritized(&store, "Alpha", [1, 1, 1, 1], &[3]).await;
    board.load().await.unwrap();
    let story = board.stories(epic).unwrap()[0].story_id;

    board.delete_story(story).await.unwrap();
    board
        .set_epic_field(epic, EpicEdit::Title("Alpha 2".to_string()))
        .unwrap();
    let outcome = board.confirm(epic).await.unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Confirmed {
            writes: 2,
            status_change: Some(EpicStatus::Unprioritized),
        }
    );
    assert_eq!(board.snapshot().unwrap().ranked.unprioritized.len(), 1);
}

#[tokio::test]
async fn test_first_write_failure_keeps_everything_pending() {
    let (store, board) = seeded_board().await;
    let epic = board.create_epic("Billing", None).await.unwrap();
    let story = board.add_story(epic, false).await.unwrap();
    board.set_story_field(story, StoryEdit::Gate(true)).unwrap();
    store.fail_on(FailurePoint::update(EntityType::Story)).unwrap();

    let result = board.confirm(epic).await;
    assertions::assert_write_failure(&result);
    assert_eq!(board.stage_state(epic).unwrap(), StageState::Dirty);
    assert!(!board.stories(epic).unwrap()[0].gate);
}

#[tokio::test]
async fn test_partial_batch_keeps_edits_and_retry_succeeds() {
    let (store, board) = seeded_board().await;
    let epic = board.create_epic("Billing", None).await.unwrap();
    let story = board.add_story(epic, false).await.unwrap();
    board
        .set_epic_field(epic, EpicEdit::Title("Invoicing".to_string()))
        .unwrap();
    board
        .set_story_field(story, StoryEdit::Title("Export CSV".to_string()))
        .unwrap();
    store.fail_on(FailurePoint::update(EntityType::Story)).unwrap();

    let result = board.confirm(epic).await;
    assertions::assert_partial_batch(&result, 1);
    assert_eq!(board.stage_state(epic).unwrap(), StageState::Dirty);
    assert_eq!(
        board.display_value(epic, EpicField::Title).unwrap(),
        EpicEdit::Title("Invoicing".to_string())
    );
    // The epic write landed before the story write failed.
    assert_eq!(store.epic_get(epic).await.unwrap().unwrap().title, "Invoicing");

    store.clear_failures().unwrap();
    let outcome = board.confirm(epic).await.unwrap();
    assert!(matches!(outcome, ConfirmOutcome::Confirmed { writes: 2, .. }));
    assert_eq!(board.stories(epic).unwrap()[0].title, "Export CSV");
    assert_eq!(board.stage_state(epic).unwrap(), StageState::Clean);
}

#[tokio::test]
async fn test_second_confirm_while_flushing_is_ignored() {
    init_tracing();
    let inner = fixtures::seeded_store().await;
    let store = Arc::new(YieldingStore::new(inner.clone()));
    let board = EpicBoard::new(store, DashboardConfig::default());
    board.load().await.unwrap();
    let epic = board.create_epic("Billing", None).await.unwrap();
    board
        .set_epic_field(epic, EpicEdit::Title("Invoicing".to_string()))
        .unwrap();

    let writes_before = inner.write_count();
    let (first, second) = tokio::join!(board.confirm(epic), board.confirm(epic));
    assert!(matches!(first.unwrap(), ConfirmOutcome::Confirmed { writes: 1, .. }));
    assert_eq!(second.unwrap(), ConfirmOutcome::AlreadyFlushing);
    assert_eq!(inner.write_count(), writes_before + 1);
    assert_eq!(board.stage_state(epic).unwrap(), StageState::Clean);
}

#[tokio::test]
async fn test_edits_staged_during_confirm_stay_pending() {
    init_tracing();
    let inner = fixtures::seeded_store().await;
    let board = EpicBoard::new(
        Arc::new(YieldingStore::new(inner.clone())),
        DashboardConfig::default(),
    );
    board.load().await.unwrap();
    let epic = board.create_epic("Billing", None).await.unwrap();
    let story = board.add_story(epic, false).await.unwrap();
    board
        .set_epic_field(epic, EpicEdit::Title("Invoicing".to_string()))
        .unwrap();
    board
        .set_story_field(story, StoryEdit::Points(StoryPoints::new(5).unwrap()))
        .unwrap();

    let (first, _) = tokio::join!(board.confirm(epic), async {
        assert_eq!(board.stage_state(epic).unwrap(), StageState::Flushing);
        board
            .set_epic_field(epic, EpicEdit::Title("Payments".to_string()))
            .unwrap();
        board
            .set_epic_field(epic, EpicEdit::Score(RtqsDimension::R, score(7)))
            .unwrap();
        board.set_story_field(story, StoryEdit::Gate(true)).unwrap();
    });
    assert_eq!(
        first.unwrap(),
        ConfirmOutcome::Confirmed {
            writes: 2,
            status_change: None,
        }
    );

    // Only the values read at confirm time were written.
    assert_eq!(inner.epic_get(epic).await.unwrap().unwrap().title, "Invoicing");
    assert_eq!(board.stories(epic).unwrap()[0].points.get(), 5);
    assert!(!board.stories(epic).unwrap()[0].gate);

    assert_eq!(board.stage_state(epic).unwrap(), StageState::Dirty);
    assert_eq!(
        board.display_value(epic, EpicField::Title).unwrap(),
        EpicEdit::Title("Payments".to_string())
    );
    assert_eq!(
        board.display_value(epic, EpicField::Score(RtqsDimension::R)).unwrap(),
        EpicEdit::Score(RtqsDimension::R, score(7))
    );
    assert_eq!(
        board.story_display_value(story, StoryField::Gate).unwrap(),
        StoryEdit::Gate(true)
    );
    assert_eq!(
        board.story_display_value(story, StoryField::Points).unwrap(),
        StoryEdit::Points(StoryPoints::new(5).unwrap())
    );

    // R = 7 with five points of effort now qualifies the epic.
    let second = board.confirm(epic).await.unwrap();
    assert_eq!(
        second,
        ConfirmOutcome::Confirmed {
            writes: 3,
            status_change: Some(EpicStatus::Prioritized),
        }
    );
    assert_eq!(board.stage_state(epic).unwrap(), StageState::Clean);
    let stored = inner.epic_get(epic).await.unwrap().unwrap();
    assert_eq!(stored.title, "Payments");
    assert_eq!(stored.scores.r, score(7));
    assert!(board.stories(epic).unwrap()[0].gate);
}

#[tokio::test]
async fn test_failed_status_write_is_partial_batch() {
    let (store, board) = seeded_board().await;
    let epic = fixtures::scored_epic("Alpha", [3, 3, 3, 3]);
    store.epic_insert(&epic).await.unwrap();
    let story = fixtures::official_story(epic.epic_id, 0, 3);
    store.story_insert(&story).await.unwrap();
    board.load().await.unwrap();
    assert_eq!(board.snapshot().unwrap().ranked.unprioritized.len(), 1);

    board
        .set_story_field(story.story_id, StoryEdit::Points(StoryPoints::new(5).unwrap()))
        .unwrap();
    store.fail_on(FailurePoint::update(EntityType::Epic)).unwrap();

    let result = board.confirm(epic.epic_id).await;
    assertions::assert_partial_batch(&result, 1);
    assert_eq!(board.stage_state(epic.epic_id).unwrap(), StageState::Dirty);
    let stored = store.epic_get(epic.epic_id).await.unwrap().unwrap();
    assert_eq!(stored.status, EpicStatus::Unprioritized);
    // The story write landed before the status write failed.
    assert_eq!(board.stories(epic.epic_id).unwrap()[0].points.get(), 5);

    store.clear_failures().unwrap();
    let outcome = board.confirm(epic.epic_id).await.unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Confirmed {
            writes: 2,
            status_change: Some(EpicStatus::Prioritized),
        }
    );
    assert_eq!(board.stage_state(epic.epic_id).unwrap(), StageState::Clean);
    assert_eq!(board.snapshot().unwrap().ranked.prioritized.len(), 1);
}

// ============================================================================
// WORKFLOW AND ORDERING
// ============================================================================

#[tokio::test]
async fn test_proposed_epic_and_story_validation() {
    let (_, board) = seeded_board().await;
    let epic = board.propose_epic("Idea", None).await.unwrap();
    let story = board.add_story(epic, true).await.unwrap();
    assert_eq!(board.snapshot().unwrap().ranked.proposed.len(), 1);
    assert_eq!(board.display(epic).unwrap().total_effort, 0);

    board.validate_story(story).await.unwrap();
    assert_eq!(board.display(epic).unwrap().total_effort, 1);

    let status = board.validate_epic(epic).await.unwrap();
    assert_eq!(status, EpicStatus::Unprioritized);
    let ranked = board.snapshot().unwrap().ranked;
    assert!(ranked.proposed.is_empty());
    assert_eq!(ranked.unprioritized.len(), 1);
}

#[tokio::test]
async fn test_move_story_swaps_neighbours() {
    let (store, board) = seeded_board().await;
    let epic = board.create_epic("Billing", None).await.unwrap();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(board.add_story(epic, false).await.unwrap());
    }

    assert!(board.move_story(ids[1], MoveDirection::Up).await.unwrap());
    let stories = board.stories(epic).unwrap();
    let order: Vec<_> = stories.iter().map(|s| s.story_id).collect();
    assert_eq!(order, vec![ids[1], ids[0], ids[2]]);
    let indexes: Vec<i32> = stories.iter().map(|s| s.order_index).collect();
    assert_eq!(indexes, vec![0, 1, 2]);

    let writes = store.write_count();
    assert!(!board.move_story(ids[1], MoveDirection::Up).await.unwrap());
    assert!(!board.move_story(ids[2], MoveDirection::Down).await.unwrap());
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn test_delete_story_compacts_order() {
    let (_, board) = seeded_board().await;
    let epic = board.create_epic("Billing", None).await.unwrap();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(board.add_story(epic, false).await.unwrap());
    }
    board.delete_story(ids[1]).await.unwrap();

    let stories = board.stories(epic).unwrap();
    assert_eq!(stories.len(), 2);
    assert_eq!(stories[1].story_id, ids[2]);
    assert_eq!(stories[1].order_index, 1);

    let next = board.add_story(epic, false).await.unwrap();
    assert_eq!(board.stories(epic).unwrap()[2].story_id, next);
    assert_eq!(board.stories(epic).unwrap()[2].order_index, 2);
}

#[tokio::test]
async fn test_delete_epic_removes_stories_and_edits() {
    let (store, board) = seeded_board().await;
    let epic = board.create_epic("Billing", None).await.unwrap();
    board.add_story(epic, false).await.unwrap();
    board
        .set_epic_field(epic, EpicEdit::Link(Some("https://tracker/1".to_string())))
        .unwrap();

    board.delete_epic(epic).await.unwrap();
    assert_eq!(store.epic_count().unwrap(), 0);
    assert_eq!(store.story_count().unwrap(), 0);
    assertions::assert_unknown_record(&board.stage_state(epic), EntityType::Epic);
}

// ============================================================================
// VIEW SOURCE
// ============================================================================

#[tokio::test]
async fn test_local_fallback_when_view_missing() {
    let (store, board) = seeded_board().await;
    insert_prioritized(&store, "Alpha", [3, 3, 3, 3], &[2]).await;
    store.set_views_available(false);
    board.load().await.unwrap();

    let snapshot = board.snapshot().unwrap();
    assert_eq!(snapshot.view_source, ViewSource::Local);
    assert!(snapshot.divergences.is_empty());
    assert_eq!(snapshot.ranked.prioritized[0].priority, 6.0);
}

#[tokio::test]
async fn test_divergent_store_view_is_kept_and_reported() {
    let (store, board) = seeded_board().await;
    let epic = insert_prioritized(&store, "Alpha", [3, 3, 3, 3], &[2]).await;
    store.skew_priority_views(0.25).unwrap();
    board.load().await.unwrap();

    let snapshot = board.snapshot().unwrap();
    assert_eq!(snapshot.view_source, ViewSource::Store);
    assert_eq!(snapshot.ranked.prioritized[0].priority, 6.25);
    assert_eq!(snapshot.divergences.len(), 1);
    let divergence = &snapshot.divergences[0];
    assert_eq!(divergence.column, "priority");
    assert_eq!(divergence.record.id, epic.as_uuid());
    assert_eq!(divergence.local_value, 6.0);
}

// ============================================================================
// ANALYTICS
// ============================================================================

#[tokio::test]
async fn test_analytics_over_prioritized_epics() {
    let (store, board) = seeded_board().await;
    insert_prioritized(&store, "Alpha", [3, 3, 3, 3], &[5, 3]).await;
    insert_prioritized(&store, "Beta", [1, 1, 1, 1], &[8]).await;
    board.create_epic("Unscored", None).await.unwrap();

    let report = board.analytics().unwrap();
    assert!(!report.is_empty());
    assert_eq!(report.prioritized_epics, 2);

    // Alpha: 12 / 8 = 1.5. Beta: 4 / 8 = 0.5.
    let names: Vec<&str> = report.priority_value.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["0-1", "1-2"]);
    assert_eq!(report.priority_value[1].total_value, 12.0);
    assert_eq!(report.priority_effort[0].total_effort, 8);

    let first = &report.story_position[0];
    assert_eq!(first.name, "1st");
    assert_eq!(first.story_count, 2);
    assert_eq!(first.total_points, 13);
}
