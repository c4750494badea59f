// SPDX-License-Identifier: MIT

//! Arbitrary per-user progress items.
//!
//! The engine stores and streams these untouched; only client apps assign
//! meaning to the fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::event::MetadataValue;

/// A progress item document.
///
/// Stored at: `<root>/<user_id>/<progress_key>/<item_id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressItem {
    pub id: String,
    #[serde(default)]
    pub fields: HashMap<String, MetadataValue>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub date_updated: Option<DateTime<Utc>>,
}

/// One observed change in a progress collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressChange {
    Added(ProgressItem),
    Modified(ProgressItem),
    Removed(String),
}
