// SPDX-License-Identifier: MIT

//! Streak freeze documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A consumable token that fills one missed local day to keep a streak alive.
///
/// Stored at: `<root>/<user_id>/<streak_key>/streak_freezes/data/<id>`
///
/// Freezes transition once from available to used and are never deleted by
/// the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakFreeze {
    pub id: String,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub earned_at: Option<DateTime<Utc>>,
    /// None means not yet consumed.
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub used_at: Option<DateTime<Utc>>,
    /// None means the freeze never expires.
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StreakFreeze {
    /// Whether this freeze can still be consumed at `now`.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at.is_none_or(|expiry| now <= expiry)
    }
}
