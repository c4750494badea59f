// SPDX-License-Identifier: MIT

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running; set
//! FIRESTORE_EMULATOR_HOST before invoking them. Scopes are keyed by unique
//! user ids so runs do not interfere with each other.

mod common;
use common::{freeze, parse_time, streak_config, streak_event, xp_event, ROOT};

use streak_engine::db::{FirestoreDb, Store};
use streak_engine::models::{FreezeBehavior, XpConfig};
use streak_engine::services::{StreakProcessor, XpProcessor};

/// Generate a unique user id for test isolation.
fn unique_user_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("user-{}", nanos)
}

/// Create a test database connection.
async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[tokio::test]
async fn test_event_and_freeze_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let repo = db.streak_repository(ROOT, &user_id, "workout");

    assert!(repo.list_events().await.unwrap().is_empty());
    assert!(repo.list_freezes().await.unwrap().is_empty());

    repo.append_event(&streak_event("e2", "2025-01-02T12:00:00Z"))
        .await
        .unwrap();
    repo.append_event(&streak_event("e1", "2025-01-01T12:00:00Z"))
        .await
        .unwrap();

    let events = repo.list_events().await.unwrap();
    assert_eq!(events.len(), 2);
    // Ascending by created_at regardless of insertion order.
    assert_eq!(events[0].id, "e1");
    assert_eq!(events[1].id, "e2");
    assert_eq!(events[0].created_at, parse_time("2025-01-01T12:00:00Z"));

    println!("✓ Events round-tripped: user_id={}", user_id);
}

#[tokio::test]
async fn test_append_event_is_idempotent() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let repo = db.streak_repository(ROOT, &user_id, "workout");

    let event = streak_event("e1", "2025-01-01T12:00:00Z");
    repo.append_event(&event).await.unwrap();
    repo.append_event(&event).await.unwrap();

    assert_eq!(repo.list_events().await.unwrap().len(), 1);

    println!("✓ Append idempotency verified: user_id={}", user_id);
}

#[tokio::test]
async fn test_mark_freeze_used_conflicts_on_retry() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let repo = db.streak_repository(ROOT, &user_id, "workout");

    repo.append_event(&streak_event("e1", "2025-01-01T12:00:00Z"))
        .await
        .unwrap();
    seed_freeze(&db, &user_id, "workout", &freeze("f1", "2024-12-20T00:00:00Z")).await;

    let at = parse_time("2025-01-03T00:00:00Z");
    repo.mark_freeze_used("f1", at).await.unwrap();

    let err = repo.mark_freeze_used("f1", at).await.unwrap_err();
    assert!(err.is_conflict(), "second mark_used should conflict");

    let freezes = repo.list_freezes().await.unwrap();
    assert_eq!(freezes.len(), 1);
    assert_eq!(freezes[0].used_at, Some(at));

    println!("✓ Freeze conflict verified: user_id={}", user_id);
}

#[tokio::test]
async fn test_streak_orchestration_end_to_end() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let repo = db.streak_repository(ROOT, &user_id, "workout");

    repo.append_event(&streak_event("e1", "2025-01-01T12:00:00Z"))
        .await
        .unwrap();
    repo.append_event(&streak_event("e2", "2025-01-02T12:00:00Z"))
        .await
        .unwrap();
    seed_freeze(&db, &user_id, "workout", &freeze("f1", "2024-12-20T00:00:00Z")).await;

    let now = parse_time("2025-01-04T12:00:00Z");
    let config = streak_config(FreezeBehavior::AutoConsume);

    let processor = StreakProcessor::new(db.streak_repository(ROOT, &user_id, "workout"));
    let summary = processor
        .run_at(&user_id, "workout", &config, None, now)
        .await
        .unwrap();

    assert_eq!(summary.current_streak, 2);
    assert_eq!(summary.total_events, 3);
    assert_eq!(summary.freezes_available_count, 0);

    // The synthesized event and the used freeze are durable.
    let events = repo.list_events().await.unwrap();
    assert_eq!(events.iter().filter(|e| e.is_freeze).count(), 1);
    let freezes = repo.list_freezes().await.unwrap();
    assert_eq!(freezes[0].used_at, Some(now));

    // Second run converges on the same summary.
    let processor = StreakProcessor::new(db.streak_repository(ROOT, &user_id, "workout"));
    let again = processor
        .run_at(&user_id, "workout", &config, None, now)
        .await
        .unwrap();
    assert_eq!(summary, again);

    println!("✓ Streak orchestration verified: user_id={}", user_id);
}

#[tokio::test]
async fn test_xp_orchestration_end_to_end() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    let repo = db.xp_repository(ROOT, &user_id, "quiz");

    repo.append_event(&xp_event("x1", "2025-01-15T10:00:00Z", 10))
        .await
        .unwrap();
    repo.append_event(&xp_event("x2", "2025-01-20T10:00:00Z", 5))
        .await
        .unwrap();

    let config = XpConfig {
        experience_id: "quiz".to_string(),
        use_server_calculation: true,
    };
    let processor = XpProcessor::new(db.xp_repository(ROOT, &user_id, "quiz"));
    let summary = processor
        .run_at(&user_id, "quiz", &config, None, parse_time("2025-01-21T00:00:00Z"))
        .await
        .unwrap();

    assert_eq!(summary.points_all_time, 15);
    assert_eq!(summary.points_last_7_days, 15);

    println!("✓ XP orchestration verified: user_id={}", user_id);
}

#[tokio::test]
async fn test_progress_items_round_trip() {
    require_emulator!();

    use std::collections::HashMap;
    use streak_engine::models::{MetadataValue, ProgressItem};

    let db = test_db().await;
    let user_id = unique_user_id();
    let repo = db.progress_repository(ROOT, &user_id, "badges");

    let item = ProgressItem {
        id: "badge-1".to_string(),
        fields: HashMap::from([
            ("level".to_string(), MetadataValue::Int(2)),
            ("name".to_string(), MetadataValue::Str("Early Bird".to_string())),
            ("unlocked".to_string(), MetadataValue::Bool(true)),
        ]),
        date_updated: Some(parse_time("2025-01-15T10:00:00Z")),
    };
    repo.upsert_item(&item).await.unwrap();

    let items = repo.list_items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0], item);

    repo.delete_item("badge-1").await.unwrap();
    assert!(repo.list_items().await.unwrap().is_empty());

    println!("✓ Progress items verified: user_id={}", user_id);
}

/// Write a freeze document directly into the freezes subcollection, the way
/// a client SDK would when a user earns one.
async fn seed_freeze(
    db: &FirestoreDb,
    user_id: &str,
    streak_key: &str,
    freeze: &streak_engine::models::StreakFreeze,
) {
    db.upsert_freeze(ROOT, user_id, streak_key, freeze)
        .await
        .expect("seed freeze");
}
