// SPDX-License-Identifier: MIT

//! Callable orchestrators.
//!
//! These bind the pure calculators to the repository contract:
//! read -> calculate -> apply freeze consumptions -> re-read -> recalculate
//! -> upsert summary. They are the only components that suspend for I/O.
//!
//! Consumptions apply sequentially so a failure leaves a clean prefix
//! behind; every write is keyed deterministically, so retrying the same
//! invocation converges instead of duplicating.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;

use crate::calendar;
use crate::db::{StreakRepository, XpRepository};
use crate::error::Result;
use crate::models::{StreakConfig, StreakEvent, StreakSummary, XpConfig, XpSummary};
use crate::services::{streak, xp};

/// Orchestrates one streak calculation for a `(user_id, streak_key)` scope.
pub struct StreakProcessor {
    repo: Box<dyn StreakRepository>,
}

impl StreakProcessor {
    pub fn new(repo: Box<dyn StreakRepository>) -> Self {
        Self { repo }
    }

    /// Run a full calculation at the current instant.
    pub async fn run(
        &self,
        user_id: &str,
        streak_key: &str,
        config: &StreakConfig,
        zone_override: Option<Tz>,
    ) -> Result<StreakSummary> {
        self.run_at(user_id, streak_key, config, zone_override, Utc::now())
            .await
    }

    /// Run a full calculation at a caller-supplied instant.
    ///
    /// The clock is an input so tests (and backfills) can drive it.
    pub async fn run_at(
        &self,
        user_id: &str,
        streak_key: &str,
        config: &StreakConfig,
        zone_override: Option<Tz>,
        now: DateTime<Utc>,
    ) -> Result<StreakSummary> {
        let events = self.repo.list_events().await?;
        let freezes = self.repo.list_freezes().await?;
        let zone = resolve_zone(zone_override, &events);

        let first = streak::calculate_streak(
            &events, &freezes, config, user_id, streak_key, now, zone,
        );

        let summary = if first.consumptions.is_empty() {
            first.summary
        } else {
            for consumption in &first.consumptions {
                let event = StreakEvent {
                    // Deterministic on retry: a repeated invocation upserts
                    // the same document instead of creating a second one.
                    id: format!("freeze-{}", consumption.freeze_id),
                    created_at: calendar::day_start(consumption.day, zone),
                    timezone: first
                        .summary
                        .last_event_timezone
                        .clone()
                        .unwrap_or_else(|| zone.name().to_string()),
                    is_freeze: true,
                    freeze_id: Some(consumption.freeze_id.clone()),
                    metadata: HashMap::new(),
                };
                self.repo.append_event(&event).await?;

                match self.repo.mark_freeze_used(&consumption.freeze_id, now).await {
                    Err(err) if err.is_conflict() => {
                        tracing::warn!(
                            freeze_id = %consumption.freeze_id,
                            "Freeze already marked used; continuing"
                        );
                    }
                    other => other?,
                }
            }

            tracing::info!(
                user_id = %user_id,
                streak_key = %streak_key,
                consumed = first.consumptions.len(),
                "Consumed freezes to close streak gap"
            );

            // The second pass sees the synthesized freeze events on the gap
            // days, so the gap is closed and no further consumptions appear.
            let events = self.repo.list_events().await?;
            let freezes = self.repo.list_freezes().await?;
            let second = streak::calculate_streak(
                &events, &freezes, config, user_id, streak_key, now, zone,
            );
            if !second.consumptions.is_empty() {
                tracing::warn!(
                    user_id = %user_id,
                    streak_key = %streak_key,
                    count = second.consumptions.len(),
                    "Recalculation still wants consumptions; not applying"
                );
            }
            second.summary
        };

        self.repo.upsert_summary(&summary).await?;

        tracing::debug!(
            user_id = %user_id,
            streak_key = %streak_key,
            current_streak = summary.current_streak,
            longest_streak = summary.longest_streak,
            "Streak summary stored"
        );

        Ok(summary)
    }
}

/// Orchestrates one XP calculation for a `(user_id, experience_key)` scope.
pub struct XpProcessor {
    repo: Box<dyn XpRepository>,
}

impl XpProcessor {
    pub fn new(repo: Box<dyn XpRepository>) -> Self {
        Self { repo }
    }

    pub async fn run(
        &self,
        user_id: &str,
        experience_key: &str,
        config: &XpConfig,
        zone_override: Option<Tz>,
    ) -> Result<XpSummary> {
        self.run_at(user_id, experience_key, config, zone_override, Utc::now())
            .await
    }

    pub async fn run_at(
        &self,
        user_id: &str,
        experience_key: &str,
        config: &XpConfig,
        zone_override: Option<Tz>,
        now: DateTime<Utc>,
    ) -> Result<XpSummary> {
        let events = self.repo.list_events().await?;
        // XP events carry no timezone; UTC unless the caller says otherwise.
        let zone = zone_override.unwrap_or(chrono_tz::UTC);

        let summary = xp::calculate_xp(&events, config, user_id, experience_key, now, zone);
        self.repo.upsert_summary(&summary).await?;

        tracing::debug!(
            user_id = %user_id,
            experience_key = %experience_key,
            points_all_time = summary.points_all_time,
            "XP summary stored"
        );

        Ok(summary)
    }
}

/// Caller zone wins; otherwise the latest event's device zone; otherwise UTC.
fn resolve_zone(zone_override: Option<Tz>, events: &[StreakEvent]) -> Tz {
    if let Some(zone) = zone_override {
        return zone;
    }
    let Some(latest) = events.iter().max_by_key(|e| e.created_at) else {
        return chrono_tz::UTC;
    };
    match latest.timezone.parse::<Tz>() {
        Ok(zone) => zone,
        Err(_) => {
            tracing::warn!(
                timezone = %latest.timezone,
                "Event carries unrecognized timezone; falling back to UTC"
            );
            chrono_tz::UTC
        }
    }
}
