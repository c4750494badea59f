//! Pre-computed summary documents for O(1) client reads.
//!
//! Summaries are overwrite-merged on every calculation and carry no history.
//! Clients watch the summary document instead of re-deriving state from the
//! event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::event::{StreakEvent, XpEvent};
use crate::models::freeze::StreakFreeze;

/// The latent state of a streak, projected from its summary.
///
/// Nothing is stored; the state is recomputed from the summary fields
/// whenever someone asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakState {
    /// The streak is alive and today already qualified.
    Active,
    /// The streak is alive but today has not yet met the goal.
    AtRisk,
    /// No current streak.
    Broken,
}

/// Streak summary document.
///
/// Stored at: `<root>/<user_id>/<streak_key>/current_streak`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub streak_key: String,
    pub user_id: String,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub date_last_event: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_event_timezone: Option<String>,
    /// Set iff `current_streak > 0`.
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub date_streak_start: Option<DateTime<Utc>>,
    /// Count of all events, including synthesized freeze events.
    #[serde(default)]
    pub total_events: u32,
    #[serde(default)]
    pub freezes_available: Vec<StreakFreeze>,
    #[serde(default)]
    pub freezes_available_count: u32,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub date_updated: DateTime<Utc>,
    #[serde(default)]
    pub events_required_per_day: u32,
    /// Events on today's literal local day, freezes included.
    #[serde(default)]
    pub today_event_count: u32,
    /// Events from the last 60 local days, leeway-adjusted, ascending.
    #[serde(default)]
    pub recent_events: Vec<StreakEvent>,
}

impl StreakSummary {
    /// Project the latent streak state.
    pub fn state(&self) -> StreakState {
        if self.current_streak == 0 {
            StreakState::Broken
        } else if self.today_event_count >= self.events_required_per_day.max(1) {
            StreakState::Active
        } else {
            StreakState::AtRisk
        }
    }
}

/// Experience-points summary document.
///
/// Stored at: `<root>/<user_id>/<experience_key>/current_xp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpSummary {
    pub experience_key: String,
    pub user_id: String,
    #[serde(default)]
    pub points_all_time: i64,
    #[serde(default)]
    pub points_today: i64,
    #[serde(default)]
    pub events_today_count: u32,
    #[serde(default)]
    pub points_this_week: i64,
    #[serde(default)]
    pub points_last_7_days: i64,
    #[serde(default)]
    pub points_this_month: i64,
    #[serde(default)]
    pub points_last_30_days: i64,
    #[serde(default)]
    pub points_this_year: i64,
    #[serde(default)]
    pub points_last_12_months: i64,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub date_last_event: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub date_updated: DateTime<Utc>,
    /// Events from the last 60 local days, ascending.
    #[serde(default)]
    pub recent_events: Vec<XpEvent>,
}
