// SPDX-License-Identifier: MIT

//! Event documents appended by client applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scalar metadata value.
///
/// Client apps attach free-form key/value pairs to events; the engine never
/// interprets them, but they must round-trip through the store losslessly.
/// The untagged representation stores each value natively (bool, 64-bit
/// integer, 64-bit float, string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// A streak event document.
///
/// Stored at: `<root>/<user_id>/<streak_key>/streak_events/data/<id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakEvent {
    /// Unique within a user+streak-key; also the document ID.
    pub id: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    /// IANA zone the device believed it was in when the event was recorded.
    pub timezone: String,
    /// True for synthesized gap-fill events written during freeze consumption.
    #[serde(default)]
    pub is_freeze: bool,
    /// Set iff `is_freeze`; references the consumed freeze document.
    #[serde(default)]
    pub freeze_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, MetadataValue>,
}

/// An experience-points event document.
///
/// Stored at: `<root>/<user_id>/<experience_key>/xp_events/data/<id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpEvent {
    pub id: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub metadata: HashMap<String, MetadataValue>,
}
