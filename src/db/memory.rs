// SPDX-License-Identifier: MIT

//! In-process store adapter.
//!
//! Mirrors the Firestore adapter's semantics (upsert-by-id events, merge
//! summaries, freeze mark-used preconditions) without any I/O, for tests and
//! local development. Streams are push-driven via a per-scope version
//! counter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::stream;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::db::{
    ChangeStream, ProgressRepository, Store, StreakRepository, SummaryStream, XpRepository,
};
use crate::error::{AppError, Result};
use crate::models::{ProgressItem, StreakEvent, StreakFreeze, StreakSummary, XpEvent, XpSummary};
use crate::services::freeze;

#[derive(Default)]
struct ScopeData {
    streak_events: BTreeMap<String, StreakEvent>,
    freezes: BTreeMap<String, StreakFreeze>,
    streak_summary: Option<StreakSummary>,
    xp_events: BTreeMap<String, XpEvent>,
    xp_summary: Option<XpSummary>,
    progress: BTreeMap<String, ProgressItem>,
}

/// One `(root, user_id, key)` scope.
struct Scope {
    data: Mutex<ScopeData>,
    changed: watch::Sender<u64>,
}

impl Scope {
    fn new() -> Self {
        Self {
            data: Mutex::new(ScopeData::default()),
            changed: watch::channel(0).0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScopeData> {
        self.data.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn notify(&self) {
        self.changed.send_modify(|version| *version += 1);
    }
}

/// In-memory document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    scopes: Arc<DashMap<String, Arc<Scope>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope(&self, root: &str, user_id: &str, key: &str) -> Arc<Scope> {
        self.scopes
            .entry(format!("{root}/{user_id}/{key}"))
            .or_insert_with(|| Arc::new(Scope::new()))
            .clone()
    }
}

impl Store for MemoryStore {
    fn streak_repository(
        &self,
        root: &str,
        user_id: &str,
        streak_key: &str,
    ) -> Box<dyn StreakRepository> {
        Box::new(MemoryStreakRepository {
            scope: self.scope(root, user_id, streak_key),
        })
    }

    fn xp_repository(
        &self,
        root: &str,
        user_id: &str,
        experience_key: &str,
    ) -> Box<dyn XpRepository> {
        Box::new(MemoryXpRepository {
            scope: self.scope(root, user_id, experience_key),
        })
    }

    fn progress_repository(
        &self,
        root: &str,
        user_id: &str,
        progress_key: &str,
    ) -> Box<dyn ProgressRepository> {
        Box::new(MemoryProgressRepository {
            scope: self.scope(root, user_id, progress_key),
        })
    }
}

// ─── Streak Repository ───────────────────────────────────────

struct MemoryStreakRepository {
    scope: Arc<Scope>,
}

#[async_trait]
impl StreakRepository for MemoryStreakRepository {
    async fn list_events(&self) -> Result<Vec<StreakEvent>> {
        let mut events: Vec<StreakEvent> = self.scope.lock().streak_events.values().cloned().collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn list_freezes(&self) -> Result<Vec<StreakFreeze>> {
        let mut freezes: Vec<StreakFreeze> = self.scope.lock().freezes.values().cloned().collect();
        freezes.sort_by(freeze::fifo_order);
        Ok(freezes)
    }

    async fn append_event(&self, event: &StreakEvent) -> Result<()> {
        self.scope
            .lock()
            .streak_events
            .insert(event.id.clone(), event.clone());
        self.scope.notify();
        Ok(())
    }

    async fn mark_freeze_used(&self, freeze_id: &str, at: DateTime<Utc>) -> Result<()> {
        {
            let mut data = self.scope.lock();
            let freeze = data.freezes.get_mut(freeze_id).ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("freeze {} does not exist", freeze_id))
            })?;
            if freeze.used_at.is_some() {
                return Err(AppError::Conflict(format!(
                    "freeze {} is already used",
                    freeze_id
                )));
            }
            freeze.used_at = Some(at);
        }
        self.scope.notify();
        Ok(())
    }

    async fn upsert_summary(&self, summary: &StreakSummary) -> Result<()> {
        self.scope.lock().streak_summary = Some(summary.clone());
        self.scope.notify();
        Ok(())
    }

    fn stream_summary(&self) -> SummaryStream<StreakSummary> {
        let scope = self.scope.clone();
        let rx = scope.changed.subscribe();
        Box::pin(stream::unfold(
            (scope, rx, true),
            |(scope, mut rx, mut first)| async move {
                loop {
                    if first {
                        first = false;
                    } else if rx.changed().await.is_err() {
                        return None;
                    }
                    let summary = scope.lock().streak_summary.clone();
                    if let Some(summary) = summary {
                        return Some((Ok(summary), (scope, rx, false)));
                    }
                }
            },
        ))
    }
}

/// Seed helpers used by tests and local tooling.
impl MemoryStore {
    pub fn seed_streak_event(&self, root: &str, user_id: &str, streak_key: &str, event: StreakEvent) {
        let scope = self.scope(root, user_id, streak_key);
        scope.lock().streak_events.insert(event.id.clone(), event);
        scope.notify();
    }

    pub fn seed_freeze(&self, root: &str, user_id: &str, streak_key: &str, freeze: StreakFreeze) {
        let scope = self.scope(root, user_id, streak_key);
        scope.lock().freezes.insert(freeze.id.clone(), freeze);
        scope.notify();
    }

    pub fn seed_xp_event(&self, root: &str, user_id: &str, experience_key: &str, event: XpEvent) {
        let scope = self.scope(root, user_id, experience_key);
        scope.lock().xp_events.insert(event.id.clone(), event);
        scope.notify();
    }
}

// ─── XP Repository ───────────────────────────────────────────

struct MemoryXpRepository {
    scope: Arc<Scope>,
}

#[async_trait]
impl XpRepository for MemoryXpRepository {
    async fn list_events(&self) -> Result<Vec<XpEvent>> {
        let mut events: Vec<XpEvent> = self.scope.lock().xp_events.values().cloned().collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn append_event(&self, event: &XpEvent) -> Result<()> {
        self.scope
            .lock()
            .xp_events
            .insert(event.id.clone(), event.clone());
        self.scope.notify();
        Ok(())
    }

    async fn upsert_summary(&self, summary: &XpSummary) -> Result<()> {
        self.scope.lock().xp_summary = Some(summary.clone());
        self.scope.notify();
        Ok(())
    }

    fn stream_summary(&self) -> SummaryStream<XpSummary> {
        let scope = self.scope.clone();
        let rx = scope.changed.subscribe();
        Box::pin(stream::unfold(
            (scope, rx, true),
            |(scope, mut rx, mut first)| async move {
                loop {
                    if first {
                        first = false;
                    } else if rx.changed().await.is_err() {
                        return None;
                    }
                    let summary = scope.lock().xp_summary.clone();
                    if let Some(summary) = summary {
                        return Some((Ok(summary), (scope, rx, false)));
                    }
                }
            },
        ))
    }
}

// ─── Progress Repository ─────────────────────────────────────

struct MemoryProgressRepository {
    scope: Arc<Scope>,
}

#[async_trait]
impl ProgressRepository for MemoryProgressRepository {
    async fn list_items(&self) -> Result<Vec<ProgressItem>> {
        Ok(self.scope.lock().progress.values().cloned().collect())
    }

    async fn upsert_item(&self, item: &ProgressItem) -> Result<()> {
        self.scope
            .lock()
            .progress
            .insert(item.id.clone(), item.clone());
        self.scope.notify();
        Ok(())
    }

    async fn delete_item(&self, item_id: &str) -> Result<()> {
        self.scope.lock().progress.remove(item_id);
        self.scope.notify();
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.scope.lock().progress.clear();
        self.scope.notify();
        Ok(())
    }

    fn stream_changes(&self) -> ChangeStream {
        let scope = self.scope.clone();
        let rx = scope.changed.subscribe();
        let prev: BTreeMap<String, ProgressItem> = BTreeMap::new();
        let pending: VecDeque<crate::models::ProgressChange> = VecDeque::new();
        Box::pin(stream::unfold(
            (scope, rx, prev, pending, true),
            |(scope, mut rx, mut prev, mut pending, mut first)| async move {
                loop {
                    if let Some(change) = pending.pop_front() {
                        return Some((Ok(change), (scope, rx, prev, pending, first)));
                    }
                    if first {
                        first = false;
                    } else if rx.changed().await.is_err() {
                        return None;
                    }
                    let next = scope.lock().progress.clone();
                    pending = crate::db::diff_progress(&prev, &next).into();
                    prev = next;
                }
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataValue;
    use futures::StreamExt;
    use std::collections::HashMap;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn event(id: &str, created_at: &str) -> StreakEvent {
        StreakEvent {
            id: id.to_string(),
            created_at: utc(created_at),
            timezone: "UTC".to_string(),
            is_freeze: false,
            freeze_id: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn events_come_back_sorted() {
        let store = MemoryStore::new();
        let repo = store.streak_repository("root", "u1", "workout");

        repo.append_event(&event("b", "2025-01-02T10:00:00Z")).await.unwrap();
        repo.append_event(&event("a", "2025-01-01T10:00:00Z")).await.unwrap();

        let events = repo.list_events().await.unwrap();
        assert_eq!(events[0].id, "a");
        assert_eq!(events[1].id, "b");
    }

    #[tokio::test]
    async fn append_is_idempotent_on_id() {
        let store = MemoryStore::new();
        let repo = store.streak_repository("root", "u1", "workout");

        repo.append_event(&event("a", "2025-01-01T10:00:00Z")).await.unwrap();
        repo.append_event(&event("a", "2025-01-01T10:00:00Z")).await.unwrap();

        assert_eq!(repo.list_events().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mark_freeze_used_conflicts_on_second_call() {
        let store = MemoryStore::new();
        store.seed_freeze(
            "root",
            "u1",
            "workout",
            StreakFreeze {
                id: "f1".to_string(),
                earned_at: Some(utc("2024-12-01T00:00:00Z")),
                used_at: None,
                expires_at: None,
            },
        );
        let repo = store.streak_repository("root", "u1", "workout");

        repo.mark_freeze_used("f1", utc("2025-01-01T00:00:00Z")).await.unwrap();
        let err = repo
            .mark_freeze_used("f1", utc("2025-01-02T00:00:00Z"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let freezes = repo.list_freezes().await.unwrap();
        assert_eq!(freezes[0].used_at, Some(utc("2025-01-01T00:00:00Z")));
    }

    #[tokio::test]
    async fn scopes_are_isolated() {
        let store = MemoryStore::new();
        store
            .streak_repository("root", "u1", "workout")
            .append_event(&event("a", "2025-01-01T10:00:00Z"))
            .await
            .unwrap();

        assert!(store
            .streak_repository("root", "u2", "workout")
            .list_events()
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .streak_repository("root", "u1", "reading")
            .list_events()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn summary_stream_emits_current_then_changes() {
        let store = MemoryStore::new();
        let repo = store.streak_repository("root", "u1", "workout");

        let base = StreakSummary {
            streak_key: "workout".to_string(),
            user_id: "u1".to_string(),
            current_streak: 1,
            longest_streak: 1,
            date_last_event: None,
            last_event_timezone: None,
            date_streak_start: None,
            total_events: 1,
            freezes_available: vec![],
            freezes_available_count: 0,
            date_created: None,
            date_updated: utc("2025-01-01T00:00:00Z"),
            events_required_per_day: 1,
            today_event_count: 1,
            recent_events: vec![],
        };
        repo.upsert_summary(&base).await.unwrap();

        let mut stream = repo.stream_summary();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.current_streak, 1);

        let mut updated = base.clone();
        updated.current_streak = 2;
        repo.upsert_summary(&updated).await.unwrap();

        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.current_streak, 2);
    }

    #[tokio::test]
    async fn progress_stream_reports_lifecycle() {
        let store = MemoryStore::new();
        let repo = store.progress_repository("root", "u1", "badges");

        let item = ProgressItem {
            id: "badge-1".to_string(),
            fields: HashMap::from([("level".to_string(), MetadataValue::Int(1))]),
            date_updated: None,
        };
        repo.upsert_item(&item).await.unwrap();

        let mut stream = repo.stream_changes();
        let added = stream.next().await.unwrap().unwrap();
        assert_eq!(added, crate::models::ProgressChange::Added(item.clone()));

        let mut modified = item.clone();
        modified.fields.insert("level".to_string(), MetadataValue::Int(2));
        repo.upsert_item(&modified).await.unwrap();
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            crate::models::ProgressChange::Modified(modified)
        );

        repo.delete_item("badge-1").await.unwrap();
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            crate::models::ProgressChange::Removed("badge-1".to_string())
        );
    }
}
