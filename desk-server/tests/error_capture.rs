//! Capture pipeline integration tests: dedup window semantics, policy
//! filtering, one-shot ticket materialization and status lifecycle.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::*;
use desk_server::capture::CapturePipeline;
use desk_server::clock::ManualClock;
use desk_server::db::repository::{occurrence, ticket};
use shared::models::{CaptureContext, EscalationLevel, OccurrenceStatus, TicketPriority};

const SYSTEM_ACTOR: i64 = 42;

fn pipeline(pool: &sqlx::SqlitePool, clock: Arc<ManualClock>) -> CapturePipeline {
    CapturePipeline::new(pool.clone(), clock, SYSTEM_ACTOR)
}

#[tokio::test]
async fn dedup_collapses_repeats_inside_window() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(pool, board, CapturePolicySeed::default()).await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock.clone());
    let error = captured_error("App\\Db\\Timeout", Some(500));

    let first = p.capture(&error, &web_context()).await.unwrap().unwrap();
    clock.set(T0 + HOUR_MS);
    let second = p.capture(&error, &web_context()).await.unwrap().unwrap();
    clock.set(T0 + 2 * HOUR_MS);
    let third = p.capture(&error, &web_context()).await.unwrap().unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.id, third.id);

    let rows = occurrence::find_by_board_and_hash(pool, board, &first.error_hash)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].occurrence_count, 3);
    assert_eq!(rows[0].first_seen_at, T0);
    assert_eq!(rows[0].last_seen_at, T0 + 2 * HOUR_MS);
    assert_eq!(rows[0].status, OccurrenceStatus::Open);
    // Latest sighting wins the sample
    assert_eq!(rows[0].sample_context.captured_at, T0 + 2 * HOUR_MS);
}

#[tokio::test]
async fn window_expiry_creates_a_new_occurrence() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(pool, board, CapturePolicySeed::default()).await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock.clone());
    let error = captured_error("App\\Db\\Timeout", Some(500));

    let first = p.capture(&error, &web_context()).await.unwrap().unwrap();
    // 30h later with a 24h window: the old row has aged out
    clock.set(T0 + 30 * HOUR_MS);
    let second = p.capture(&error, &web_context()).await.unwrap().unwrap();

    assert_ne!(first.id, second.id);

    let rows = occurrence::find_by_board_and_hash(pool, board, &first.error_hash)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|o| o.occurrence_count == 1));
}

#[tokio::test]
async fn auto_ticket_fires_once_per_occurrence() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(
        pool,
        board,
        CapturePolicySeed {
            auto_ticket: true,
            priority_map: HashMap::from([(500, TicketPriority::Urgent)]),
            ..Default::default()
        },
    )
    .await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock.clone());
    let error = captured_error("App\\Db\\Timeout", Some(500));

    let first = p.capture(&error, &web_context()).await.unwrap().unwrap();
    clock.advance(HOUR_MS);
    p.capture(&error, &web_context()).await.unwrap();
    clock.advance(HOUR_MS);
    p.capture(&error, &web_context()).await.unwrap();

    let ticket_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM ticket WHERE board_id = ?")
            .bind(board)
            .fetch_one(pool)
            .await
            .unwrap();
    assert_eq!(ticket_count, 1, "repeats must not create more tickets");

    // Both directions of the ticket ↔ occurrence link
    let occ = occurrence::find_by_id(pool, first.id).await.unwrap().unwrap();
    let ticket_id = occ.ticket_id.expect("occurrence linked to ticket");
    let t = ticket::find_by_id(pool, ticket_id).await.unwrap().unwrap();
    assert_eq!(t.origin_occurrence_id, Some(occ.id));
    assert_eq!(t.priority, TicketPriority::Urgent);
    assert_eq!(t.escalation_level, EscalationLevel::None);
    assert!(t.title.starts_with("[500] Timeout:"));
    assert!(t.body.contains("app/db/pool.rb:42"));
}

#[tokio::test]
async fn status_code_filtering_respects_policy_set() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(
        pool,
        board,
        CapturePolicySeed {
            codes: vec![500, 502],
            ..Default::default()
        },
    )
    .await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock);

    // 404 is outside the capture set
    let not_captured = p
        .capture(&captured_error("App\\NotFound", Some(404)), &web_context())
        .await
        .unwrap();
    assert!(not_captured.is_none());

    // No status code: always captured, assumed more severe
    let captured = p
        .capture(&captured_error("App\\Jobs\\Crash", None), &web_context())
        .await
        .unwrap();
    assert!(captured.is_some());
}

#[tokio::test]
async fn empty_code_set_uses_default_server_errors() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(pool, board, CapturePolicySeed::default()).await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock);

    assert!(
        p.capture(&captured_error("App\\NotFound", Some(404)), &web_context())
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        p.capture(&captured_error("App\\Oops", Some(500)), &web_context())
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn console_errors_require_policy_opt_in() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(pool, board, CapturePolicySeed::default()).await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock);

    let console_ctx = CaptureContext {
        from_console: true,
        actor_id: None,
        ..Default::default()
    };
    let error = captured_error("App\\Jobs\\ImportFailed", None);

    assert!(p.capture(&error, &console_ctx).await.unwrap().is_none());

    // Opt the board in and the same error is captured, attributed to the
    // configured system actor
    sqlx::query("UPDATE error_capture_policy SET capture_console = 1 WHERE board_id = ?")
        .bind(board)
        .execute(pool)
        .await
        .unwrap();

    let occ = p.capture(&error, &console_ctx).await.unwrap().unwrap();
    assert_eq!(occ.sample_context.actor_id, Some(SYSTEM_ACTOR));
}

#[tokio::test]
async fn terminal_occurrence_is_not_reopened() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(pool, board, CapturePolicySeed::default()).await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock.clone());
    let error = captured_error("App\\Db\\Timeout", Some(500));

    let first = p.capture(&error, &web_context()).await.unwrap().unwrap();
    occurrence::resolve(pool, first.id, 7, T0 + HOUR_MS).await.unwrap();

    // Well inside the window, but the resolved row has left the dedup pool
    clock.set(T0 + 2 * HOUR_MS);
    let second = p.capture(&error, &web_context()).await.unwrap().unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.status, OccurrenceStatus::Open);
    assert_eq!(second.occurrence_count, 1);

    let old = occurrence::find_by_id(pool, first.id).await.unwrap().unwrap();
    assert_eq!(old.status, OccurrenceStatus::Resolved);
    assert_eq!(old.occurrence_count, 1, "resolved row is left untouched");
}

#[tokio::test]
async fn acknowledged_occurrence_still_deduplicates() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(pool, board, CapturePolicySeed::default()).await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock.clone());
    let error = captured_error("App\\Db\\Timeout", Some(500));

    let first = p.capture(&error, &web_context()).await.unwrap().unwrap();
    occurrence::acknowledge(pool, first.id).await.unwrap();

    clock.advance(HOUR_MS);
    let second = p.capture(&error, &web_context()).await.unwrap().unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.occurrence_count, 2);
    assert_eq!(second.status, OccurrenceStatus::Acknowledged);
}

#[tokio::test]
async fn occurrence_status_machine_rejects_bad_transitions() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(pool, board, CapturePolicySeed::default()).await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock);
    let occ = p
        .capture(&captured_error("App\\Db\\Timeout", Some(500)), &web_context())
        .await
        .unwrap()
        .unwrap();

    occurrence::resolve(pool, occ.id, 7, T0 + HOUR_MS).await.unwrap();

    // Terminal rows are immutable
    assert!(occurrence::acknowledge(pool, occ.id).await.is_err());
    assert!(occurrence::ignore(pool, occ.id, 7, T0 + 2 * HOUR_MS).await.is_err());
    assert!(occurrence::resolve(pool, occ.id, 7, T0 + 2 * HOUR_MS).await.is_err());
}

#[tokio::test]
async fn capture_fans_out_to_every_matching_board() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board_a = seed_board(pool, 11, None, None).await;
    let board_b = seed_board(pool, 12, None, None).await;
    seed_capture_policy(pool, board_a, CapturePolicySeed::default()).await;
    seed_capture_policy(pool, board_b, CapturePolicySeed::default()).await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock);
    let error = captured_error("App\\Db\\Timeout", Some(500));

    let first = p.capture(&error, &web_context()).await.unwrap().unwrap();

    let rows_a = occurrence::find_by_board_and_hash(pool, board_a, &first.error_hash)
        .await
        .unwrap();
    let rows_b = occurrence::find_by_board_and_hash(pool, board_b, &first.error_hash)
        .await
        .unwrap();
    assert_eq!(rows_a.len(), 1);
    assert_eq!(rows_b.len(), 1);

    // The convenience return value is the first board's occurrence
    assert_eq!(first.board_id, board_a.min(board_b));
}

#[tokio::test]
async fn stack_frames_are_bounded_by_policy() {
    let (db, _tmp) = test_db().await;
    let pool = &db.pool;
    let board = seed_board(pool, 11, None, None).await;
    seed_capture_policy(
        pool,
        board,
        CapturePolicySeed {
            max_frames: 1,
            ..Default::default()
        },
    )
    .await;

    let clock = Arc::new(ManualClock::new(T0));
    let p = pipeline(pool, clock);
    let occ = p
        .capture(&captured_error("App\\Db\\Timeout", Some(500)), &web_context())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(occ.sample_context.stack_frames.len(), 1);

    let stored = occurrence::find_by_id(pool, occ.id).await.unwrap().unwrap();
    assert_eq!(stored.sample_context.stack_frames.len(), 1);
}
