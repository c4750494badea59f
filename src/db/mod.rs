// SPDX-License-Identifier: MIT

//! Storage layer: the repository contract plus the Firestore and in-memory
//! adapters.
//!
//! The calculators never touch a store directly; the orchestrators hold a
//! repository scoped to one `(user_id, key)` pair, and a [`Store`] hands
//! those out. Swapping the backing store means implementing three traits.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{
    ProgressChange, ProgressItem, StreakEvent, StreakFreeze, StreakSummary, XpEvent, XpSummary,
};

/// Subcollection names under a user's key collection.
pub mod collections {
    /// Container document for streak event data.
    pub const STREAK_EVENTS: &str = "streak_events";
    /// Container document for freeze data.
    pub const STREAK_FREEZES: &str = "streak_freezes";
    /// Container document for XP event data.
    pub const XP_EVENTS: &str = "xp_events";
    /// Subcollection that holds the actual documents.
    pub const DATA: &str = "data";
}

/// Well-known document ids.
pub mod documents {
    pub const CURRENT_STREAK: &str = "current_streak";
    pub const CURRENT_XP: &str = "current_xp";
}

/// Restartable lazy sequence of summary snapshots. Consumers cancel by
/// dropping the stream.
pub type SummaryStream<T> = BoxStream<'static, Result<T>>;

/// Restartable lazy sequence of progress-collection changes.
pub type ChangeStream = BoxStream<'static, Result<ProgressChange>>;

/// Read/write surface for one `(user_id, streak_key)`.
#[async_trait]
pub trait StreakRepository: Send + Sync {
    /// All events, ascending by `created_at`.
    async fn list_events(&self) -> Result<Vec<StreakEvent>>;
    /// All freezes, ascending by `earned_at` (nulls first).
    async fn list_freezes(&self) -> Result<Vec<StreakFreeze>>;
    /// Upsert keyed by `event.id`; retrying the same append is a no-op.
    async fn append_event(&self, event: &StreakEvent) -> Result<()>;
    /// Set `used_at`. Returns a conflict when the freeze is already used.
    async fn mark_freeze_used(&self, freeze_id: &str, at: DateTime<Utc>) -> Result<()>;
    /// Merge the summary document.
    async fn upsert_summary(&self, summary: &StreakSummary) -> Result<()>;
    /// Emits the current summary and then every observed change.
    fn stream_summary(&self) -> SummaryStream<StreakSummary>;
}

/// Read/write surface for one `(user_id, experience_key)`.
#[async_trait]
pub trait XpRepository: Send + Sync {
    async fn list_events(&self) -> Result<Vec<XpEvent>>;
    async fn append_event(&self, event: &XpEvent) -> Result<()>;
    async fn upsert_summary(&self, summary: &XpSummary) -> Result<()>;
    fn stream_summary(&self) -> SummaryStream<XpSummary>;
}

/// Read/write surface for one `(user_id, progress_key)` collection.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn list_items(&self) -> Result<Vec<ProgressItem>>;
    async fn upsert_item(&self, item: &ProgressItem) -> Result<()>;
    async fn delete_item(&self, item_id: &str) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
    /// Emits adds for the current items, then every observed change.
    fn stream_changes(&self) -> ChangeStream;
}

/// Factory handing out scoped repositories.
pub trait Store: Send + Sync {
    fn streak_repository(
        &self,
        root: &str,
        user_id: &str,
        streak_key: &str,
    ) -> Box<dyn StreakRepository>;

    fn xp_repository(
        &self,
        root: &str,
        user_id: &str,
        experience_key: &str,
    ) -> Box<dyn XpRepository>;

    fn progress_repository(
        &self,
        root: &str,
        user_id: &str,
        progress_key: &str,
    ) -> Box<dyn ProgressRepository>;
}

/// Diff two progress snapshots into the changes a watcher should see.
pub(crate) fn diff_progress(
    prev: &BTreeMap<String, ProgressItem>,
    next: &BTreeMap<String, ProgressItem>,
) -> Vec<ProgressChange> {
    let mut changes = Vec::new();
    for (id, item) in next {
        match prev.get(id) {
            None => changes.push(ProgressChange::Added(item.clone())),
            Some(old) if old != item => changes.push(ProgressChange::Modified(item.clone())),
            Some(_) => {}
        }
    }
    for id in prev.keys() {
        if !next.contains_key(id) {
            changes.push(ProgressChange::Removed(id.clone()));
        }
    }
    changes
}
