// SPDX-License-Identifier: MIT

//! Shared helpers for integration tests. Not every suite uses every helper.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use streak_engine::config::Config;
use streak_engine::db::MemoryStore;
use streak_engine::models::{FreezeBehavior, StreakConfig, StreakEvent, StreakFreeze, XpEvent};
use streak_engine::AppState;

pub const ROOT: &str = "gamification";

/// Check if emulator is available via environment variable.
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

pub fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC3339")
        .with_timezone(&Utc)
}

pub fn app_state(store: MemoryStore) -> Arc<AppState> {
    Arc::new(AppState {
        config: Config::default(),
        store: Arc::new(store),
    })
}

pub fn streak_event(id: &str, created_at: &str) -> StreakEvent {
    StreakEvent {
        id: id.to_string(),
        created_at: parse_time(created_at),
        timezone: "UTC".to_string(),
        is_freeze: false,
        freeze_id: None,
        metadata: HashMap::new(),
    }
}

pub fn freeze(id: &str, earned_at: &str) -> StreakFreeze {
    StreakFreeze {
        id: id.to_string(),
        earned_at: Some(parse_time(earned_at)),
        used_at: None,
        expires_at: None,
    }
}

pub fn xp_event(id: &str, created_at: &str, points: i64) -> XpEvent {
    XpEvent {
        id: id.to_string(),
        created_at: parse_time(created_at),
        points,
        metadata: HashMap::new(),
    }
}

pub fn streak_config(behavior: FreezeBehavior) -> StreakConfig {
    StreakConfig {
        streak_id: "workout".to_string(),
        events_required_per_day: 1,
        use_server_calculation: true,
        leeway_hours: 0,
        freeze_behavior: behavior,
    }
}
