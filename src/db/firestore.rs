//! Firestore adapter.
//!
//! Document layout (collections and documents alternate):
//!
//! ```text
//! <root>/<user_id>/<key>/current_streak            streak summary
//! <root>/<user_id>/<key>/current_xp                xp summary
//! <root>/<user_id>/<key>/streak_events/data/<id>   streak event
//! <root>/<user_id>/<key>/streak_freezes/data/<id>  freeze
//! <root>/<user_id>/<key>/xp_events/data/<id>       xp event
//! <root>/<user_id>/<progress_key>/<item_id>        progress item
//! ```
//!
//! This layout is shared with the client SDKs and must not change.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::{paths, FirestoreQueryDirection, ParentPathBuilder};
use futures::stream;
use std::time::Duration;

use crate::db::{
    collections, documents, ChangeStream, ProgressRepository, Store, StreakRepository,
    SummaryStream, XpRepository,
};
use crate::error::{AppError, Result};
use crate::models::{ProgressItem, StreakEvent, StreakFreeze, StreakSummary, XpEvent, XpSummary};

/// How often the polling streams look for server-side changes. Rapid
/// intermediate versions coalesce into one emission.
const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        let client = firestore::FirestoreDb::new(project_id).await?;
        tracing::info!(project = project_id, "Connected to Firestore");
        Ok(Self { client })
    }

    /// Write a freeze document.
    ///
    /// Freezes are normally earned client-side; this write path exists for
    /// seeding and admin tooling.
    pub async fn upsert_freeze(
        &self,
        root: &str,
        user_id: &str,
        streak_key: &str,
        freeze: &StreakFreeze,
    ) -> Result<()> {
        let scope = FirestoreScope::new(self.client.clone(), root, user_id, streak_key);
        let parent = scope.data_parent(collections::STREAK_FREEZES)?;
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::DATA)
            .document_id(&freeze.id)
            .parent(&parent)
            .object(freeze)
            .execute()
            .await?;
        Ok(())
    }
}

impl Store for FirestoreDb {
    fn streak_repository(
        &self,
        root: &str,
        user_id: &str,
        streak_key: &str,
    ) -> Box<dyn StreakRepository> {
        Box::new(FirestoreStreakRepository {
            scope: FirestoreScope::new(self.client.clone(), root, user_id, streak_key),
        })
    }

    fn xp_repository(
        &self,
        root: &str,
        user_id: &str,
        experience_key: &str,
    ) -> Box<dyn XpRepository> {
        Box::new(FirestoreXpRepository {
            scope: FirestoreScope::new(self.client.clone(), root, user_id, experience_key),
        })
    }

    fn progress_repository(
        &self,
        root: &str,
        user_id: &str,
        progress_key: &str,
    ) -> Box<dyn ProgressRepository> {
        Box::new(FirestoreProgressRepository {
            scope: FirestoreScope::new(self.client.clone(), root, user_id, progress_key),
        })
    }
}

/// One `(root, user_id, key)` scope and its document paths.
#[derive(Clone)]
struct FirestoreScope {
    client: firestore::FirestoreDb,
    root: String,
    user_id: String,
    key: String,
}

impl FirestoreScope {
    fn new(client: firestore::FirestoreDb, root: &str, user_id: &str, key: &str) -> Self {
        Self {
            client,
            root: root.to_string(),
            user_id: user_id.to_string(),
            key: key.to_string(),
        }
    }

    /// Parent path of the user document: `<root>/<user_id>`.
    fn user_parent(&self) -> Result<ParentPathBuilder> {
        Ok(self.client.parent_path(&self.root, self.user_id.as_str())?)
    }

    /// Parent path of a data subcollection:
    /// `<root>/<user_id>/<key>/<container>`.
    fn data_parent(&self, container: &str) -> Result<ParentPathBuilder> {
        Ok(self
            .client
            .parent_path(&self.root, self.user_id.as_str())?
            .at(&self.key, container)?)
    }
}

// ─── Streak Repository ───────────────────────────────────────

#[derive(Clone)]
struct FirestoreStreakRepository {
    scope: FirestoreScope,
}

impl FirestoreStreakRepository {
    async fn fetch_summary(&self) -> Result<Option<StreakSummary>> {
        let parent = self.scope.user_parent()?;
        let summary = self
            .scope
            .client
            .fluent()
            .select()
            .by_id_in(&self.scope.key)
            .parent(&parent)
            .obj()
            .one(documents::CURRENT_STREAK)
            .await?;
        Ok(summary)
    }
}

#[async_trait]
impl StreakRepository for FirestoreStreakRepository {
    async fn list_events(&self) -> Result<Vec<StreakEvent>> {
        let parent = self.scope.data_parent(collections::STREAK_EVENTS)?;
        let events = self
            .scope
            .client
            .fluent()
            .select()
            .from(collections::DATA)
            .parent(&parent)
            .order_by([("created_at", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await?;
        Ok(events)
    }

    async fn list_freezes(&self) -> Result<Vec<StreakFreeze>> {
        let parent = self.scope.data_parent(collections::STREAK_FREEZES)?;
        let freezes = self
            .scope
            .client
            .fluent()
            .select()
            .from(collections::DATA)
            .parent(&parent)
            .order_by([("earned_at", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await?;
        Ok(freezes)
    }

    async fn append_event(&self, event: &StreakEvent) -> Result<()> {
        let parent = self.scope.data_parent(collections::STREAK_EVENTS)?;
        let _: () = self
            .scope
            .client
            .fluent()
            .update()
            .in_col(collections::DATA)
            .document_id(&event.id)
            .parent(&parent)
            .object(event)
            .execute()
            .await?;
        Ok(())
    }

    async fn mark_freeze_used(&self, freeze_id: &str, at: DateTime<Utc>) -> Result<()> {
        let parent = self.scope.data_parent(collections::STREAK_FREEZES)?;
        let freeze: Option<StreakFreeze> = self
            .scope
            .client
            .fluent()
            .select()
            .by_id_in(collections::DATA)
            .parent(&parent)
            .obj()
            .one(freeze_id)
            .await?;

        let mut freeze = freeze.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("freeze {} does not exist", freeze_id))
        })?;
        if freeze.used_at.is_some() {
            return Err(AppError::Conflict(format!(
                "freeze {} is already used",
                freeze_id
            )));
        }
        freeze.used_at = Some(at);

        let _: () = self
            .scope
            .client
            .fluent()
            .update()
            .fields(paths!(StreakFreeze::{used_at}))
            .in_col(collections::DATA)
            .document_id(freeze_id)
            .parent(&parent)
            .object(&freeze)
            .execute()
            .await?;
        Ok(())
    }

    async fn upsert_summary(&self, summary: &StreakSummary) -> Result<()> {
        let parent = self.scope.user_parent()?;
        let _: () = self
            .scope
            .client
            .fluent()
            .update()
            .in_col(&self.scope.key)
            .document_id(documents::CURRENT_STREAK)
            .parent(&parent)
            .object(summary)
            .execute()
            .await?;
        Ok(())
    }

    fn stream_summary(&self) -> SummaryStream<StreakSummary> {
        let repo = self.clone();
        // The interval is created on first poll so the stream can be built
        // outside a runtime.
        Box::pin(stream::unfold(
            (repo, None::<tokio::time::Interval>, None::<DateTime<Utc>>),
            |(repo, mut ticker, mut seen)| async move {
                loop {
                    ticker
                        .get_or_insert_with(|| tokio::time::interval(WATCH_POLL_INTERVAL))
                        .tick()
                        .await;
                    match repo.fetch_summary().await {
                        Ok(Some(summary)) => {
                            if seen != Some(summary.date_updated) {
                                seen = Some(summary.date_updated);
                                return Some((Ok(summary), (repo, ticker, seen)));
                            }
                        }
                        Ok(None) => {}
                        Err(err) => return Some((Err(err), (repo, ticker, seen))),
                    }
                }
            },
        ))
    }
}

// ─── XP Repository ───────────────────────────────────────────

#[derive(Clone)]
struct FirestoreXpRepository {
    scope: FirestoreScope,
}

impl FirestoreXpRepository {
    async fn fetch_summary(&self) -> Result<Option<XpSummary>> {
        let parent = self.scope.user_parent()?;
        let summary = self
            .scope
            .client
            .fluent()
            .select()
            .by_id_in(&self.scope.key)
            .parent(&parent)
            .obj()
            .one(documents::CURRENT_XP)
            .await?;
        Ok(summary)
    }
}

#[async_trait]
impl XpRepository for FirestoreXpRepository {
    async fn list_events(&self) -> Result<Vec<XpEvent>> {
        let parent = self.scope.data_parent(collections::XP_EVENTS)?;
        let events = self
            .scope
            .client
            .fluent()
            .select()
            .from(collections::DATA)
            .parent(&parent)
            .order_by([("created_at", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await?;
        Ok(events)
    }

    async fn append_event(&self, event: &XpEvent) -> Result<()> {
        let parent = self.scope.data_parent(collections::XP_EVENTS)?;
        let _: () = self
            .scope
            .client
            .fluent()
            .update()
            .in_col(collections::DATA)
            .document_id(&event.id)
            .parent(&parent)
            .object(event)
            .execute()
            .await?;
        Ok(())
    }

    async fn upsert_summary(&self, summary: &XpSummary) -> Result<()> {
        let parent = self.scope.user_parent()?;
        let _: () = self
            .scope
            .client
            .fluent()
            .update()
            .in_col(&self.scope.key)
            .document_id(documents::CURRENT_XP)
            .parent(&parent)
            .object(summary)
            .execute()
            .await?;
        Ok(())
    }

    fn stream_summary(&self) -> SummaryStream<XpSummary> {
        let repo = self.clone();
        Box::pin(stream::unfold(
            (repo, None::<tokio::time::Interval>, None::<DateTime<Utc>>),
            |(repo, mut ticker, mut seen)| async move {
                loop {
                    ticker
                        .get_or_insert_with(|| tokio::time::interval(WATCH_POLL_INTERVAL))
                        .tick()
                        .await;
                    match repo.fetch_summary().await {
                        Ok(Some(summary)) => {
                            if seen != Some(summary.date_updated) {
                                seen = Some(summary.date_updated);
                                return Some((Ok(summary), (repo, ticker, seen)));
                            }
                        }
                        Ok(None) => {}
                        Err(err) => return Some((Err(err), (repo, ticker, seen))),
                    }
                }
            },
        ))
    }
}

// ─── Progress Repository ─────────────────────────────────────

#[derive(Clone)]
struct FirestoreProgressRepository {
    scope: FirestoreScope,
}

impl FirestoreProgressRepository {
    async fn snapshot(&self) -> Result<std::collections::BTreeMap<String, ProgressItem>> {
        let items = self.list_items().await?;
        Ok(items.into_iter().map(|i| (i.id.clone(), i)).collect())
    }
}

#[async_trait]
impl ProgressRepository for FirestoreProgressRepository {
    async fn list_items(&self) -> Result<Vec<ProgressItem>> {
        let parent = self.scope.user_parent()?;
        let items = self
            .scope
            .client
            .fluent()
            .select()
            .from(self.scope.key.as_str())
            .parent(&parent)
            .obj()
            .query()
            .await?;
        Ok(items)
    }

    async fn upsert_item(&self, item: &ProgressItem) -> Result<()> {
        let parent = self.scope.user_parent()?;
        let _: () = self
            .scope
            .client
            .fluent()
            .update()
            .in_col(&self.scope.key)
            .document_id(&item.id)
            .parent(&parent)
            .object(item)
            .execute()
            .await?;
        Ok(())
    }

    async fn delete_item(&self, item_id: &str) -> Result<()> {
        let parent = self.scope.user_parent()?;
        self.scope
            .client
            .fluent()
            .delete()
            .from(self.scope.key.as_str())
            .parent(&parent)
            .document_id(item_id)
            .execute()
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let items = self.list_items().await?;
        for item in items {
            self.delete_item(&item.id).await?;
        }
        Ok(())
    }

    fn stream_changes(&self) -> ChangeStream {
        use std::collections::{BTreeMap, VecDeque};

        let repo = self.clone();
        let pending: VecDeque<crate::models::ProgressChange> = VecDeque::new();
        let prev: BTreeMap<String, ProgressItem> = BTreeMap::new();
        Box::pin(stream::unfold(
            (repo, None::<tokio::time::Interval>, prev, pending),
            |(repo, mut ticker, mut prev, mut pending)| async move {
                loop {
                    if let Some(change) = pending.pop_front() {
                        return Some((Ok(change), (repo, ticker, prev, pending)));
                    }
                    ticker
                        .get_or_insert_with(|| tokio::time::interval(WATCH_POLL_INTERVAL))
                        .tick()
                        .await;
                    match repo.snapshot().await {
                        Ok(next) => {
                            pending = crate::db::diff_progress(&prev, &next).into();
                            prev = next;
                        }
                        Err(err) => return Some((Err(err), (repo, ticker, prev, pending))),
                    }
                }
            },
        ))
    }
}
