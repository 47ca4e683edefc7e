//! Property tests for the staging overlay and story ordering.
//!
//! - Staging any set of epic edits leaves the ranked snapshot untouched.
//! - Any sequence of story moves keeps `order_index` a dense `0..n` range.

use proptest::prelude::*;
use rtqs_board::{EpicBoard, EpicEdit};
use rtqs_core::{DashboardConfig, MoveDirection, RtqsDimension};
use rtqs_test_utils::{fixtures, generators, RecordStore};
use tokio::runtime::Runtime;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn edit_strategy() -> impl Strategy<Value = (usize, EpicEdit)> {
    let dimension = prop::sample::select(RtqsDimension::ALL.to_vec());
    let edit = prop_oneof![
        (dimension, generators::arb_score()).prop_map(|(d, s)| EpicEdit::Score(d, s)),
        "[a-z]{1,12}".prop_map(EpicEdit::Title),
    ];
    (any::<usize>(), edit)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_staged_edits_never_reorder(
        epics in prop::collection::vec(generators::arb_epic(), 1..6),
        edits in prop::collection::vec(edit_strategy(), 0..12),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = fixtures::seeded_store().await;
            for epic in &epics {
                store.epic_insert(epic).await.unwrap();
                store
                    .story_insert(&fixtures::official_story(epic.epic_id, 0, 3))
                    .await
                    .unwrap();
            }
            let board = EpicBoard::new(store.clone(), DashboardConfig::default());
            board.load().await.unwrap();
            let before = board.snapshot().unwrap();

            for (index, edit) in edits {
                let epic_id = epics[index % epics.len()].epic_id;
                board.set_epic_field(epic_id, edit).unwrap();
            }

            prop_assert_eq!(board.snapshot().unwrap(), before);
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_moves_keep_dense_order(
        count in 1usize..6,
        moves in prop::collection::vec((any::<usize>(), any::<bool>()), 0..10),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = fixtures::seeded_store().await;
            let board = EpicBoard::new(store, DashboardConfig::default());
            board.load().await.unwrap();
            let epic = board.create_epic("Ordering", None).await.unwrap();
            let mut ids = Vec::new();
            for _ in 0..count {
                ids.push(board.add_story(epic, false).await.unwrap());
            }

            for (pick, up) in moves {
                let direction = if up { MoveDirection::Up } else { MoveDirection::Down };
                board.move_story(ids[pick % ids.len()], direction).await.unwrap();
            }

            let stories = board.stories(epic).unwrap();
            let indexes: Vec<i32> = stories.iter().map(|s| s.order_index).collect();
            let expected: Vec<i32> = (0..count as i32).collect();
            prop_assert_eq!(indexes, expected);
            let mut seen: Vec<_> = stories.iter().map(|s| s.story_id).collect();
            seen.sort();
            ids.sort();
            prop_assert_eq!(seen, ids);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
