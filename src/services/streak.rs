// SPDX-License-Identifier: MIT

//! The streak calculator.
//!
//! A pure function from `(events, freezes, config, now, zone)` to a new
//! summary plus the freeze consumptions needed to keep the streak alive.
//! Running it on a client or as a server callable must produce the same
//! result, so nothing in here reads a clock or touches the store.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::calendar;
use crate::models::{FreezeBehavior, StreakConfig, StreakEvent, StreakFreeze, StreakSummary};
use crate::services::freeze::{self, FreezeConsumption};
use crate::services::recent;

/// Calculator output: the summary to store plus the consumptions the
/// orchestrator must apply as writes.
#[derive(Debug, Clone)]
pub struct StreakCalculation {
    pub summary: StreakSummary,
    pub consumptions: Vec<FreezeConsumption>,
}

/// Per-local-day event tally.
#[derive(Debug, Default)]
struct DayTally {
    total: usize,
    real: usize,
    frozen: bool,
}

/// Compute a fresh streak summary from the full event log.
///
/// Days qualify when they meet the `events_required_per_day` threshold
/// (synthesized freeze events count toward it) or contain a freeze event at
/// all. Freeze-only days keep the chain alive but never increment the
/// counter; only real effort counts.
pub fn calculate_streak(
    events: &[StreakEvent],
    freezes: &[StreakFreeze],
    config: &StreakConfig,
    user_id: &str,
    streak_key: &str,
    now: DateTime<Utc>,
    zone: Tz,
) -> StreakCalculation {
    let mut available = freeze::available_fifo(freezes, now);

    if events.is_empty() {
        return StreakCalculation {
            summary: blank_summary(user_id, streak_key, config, available, now),
            consumptions: Vec::new(),
        };
    }

    // Bucket events into local days.
    let mut days: BTreeMap<NaiveDate, DayTally> = BTreeMap::new();
    for event in events {
        let tally = days
            .entry(calendar::local_day(event.created_at, zone))
            .or_default();
        tally.total += 1;
        if event.is_freeze {
            tally.frozen = true;
        } else {
            tally.real += 1;
        }
    }

    let required = config.events_required_per_day.max(1) as usize;
    let today = calendar::local_day(now, zone);

    // Qualifying days ascending, with whether each holds real effort.
    let mut qualifying: Vec<(NaiveDate, bool)> = days
        .iter()
        .filter(|(_, tally)| tally.total >= required || tally.frozen)
        .map(|(&day, tally)| (day, tally.real > 0))
        .collect();

    // Leeway: within the first hours of the local day, "today" is still
    // yesterday for streak purposes.
    let leeway_applies = config.leeway_hours > 0
        && calendar::hours_between(calendar::day_start(today, zone), now) <= config.leeway_hours;
    let anchor = if leeway_applies {
        calendar::shift_days(today, -1)
    } else {
        today
    };

    // Auto-consume freezes across the gap between the last qualifying day
    // and today. All-or-nothing: a partial save is not permitted.
    let mut consumptions = Vec::new();
    if config.freeze_behavior == FreezeBehavior::AutoConsume {
        if let Some(&(last_qual, _)) = qualifying.last() {
            let gap = (today.signed_duration_since(last_qual).num_days() - 1).max(0);
            if gap > 0 && available.len() as i64 >= gap {
                let gap_days: Vec<NaiveDate> =
                    (1..=gap).map(|i| calendar::shift_days(last_qual, i)).collect();
                consumptions = freeze::select_for_days(&gap_days, &available);
                available.retain(|f| !consumptions.iter().any(|c| c.freeze_id == f.id));
                // The filled days act as freeze-only qualifying days, exactly
                // as the synthesized events will once they are written.
                for consumption in &consumptions {
                    qualifying.push((consumption.day, false));
                }
            }
        }
    }

    // Walk backward from the anchor day counting consecutive qualifying
    // days. Freeze-only days advance the walk without incrementing.
    let mut current_streak = 0u32;
    let mut expected = anchor;
    let mut started = false;
    for &(day, has_real) in qualifying.iter().rev() {
        if day > expected {
            // Ahead of the anchor (events logged today while leeway shifted
            // the anchor back); skip without breaking the chain.
            continue;
        }
        if day == expected {
            if has_real {
                current_streak += 1;
            }
            expected = calendar::shift_days(expected, -1);
            started = true;
        } else {
            let distance = expected.signed_duration_since(day).num_days();
            // At-risk yesterday: nothing logged on the anchor day yet, but
            // yesterday qualified and the day is not over.
            let at_risk = !started
                && distance == 1
                && (anchor == today || config.leeway_hours > 0);
            if at_risk {
                if has_real {
                    current_streak += 1;
                }
                expected = calendar::shift_days(day, -1);
                started = true;
            } else {
                break;
            }
        }
    }

    // Longest streak: forward scan over qualifying days. A gap resets the
    // run; freeze-only days bridge runs without adding to them.
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for &(day, has_real) in &qualifying {
        match prev {
            Some(p) if day.signed_duration_since(p).num_days() == 1 => {
                if has_real {
                    run += 1;
                }
            }
            Some(_) => {
                longest = longest.max(run);
                run = u32::from(has_real);
            }
            None => run = u32::from(has_real),
        }
        prev = Some(day);
    }
    let longest_streak = longest.max(run).max(current_streak);

    let last_event = events.iter().max_by_key(|e| e.created_at);
    let date_streak_start = (current_streak > 0).then(|| {
        calendar::day_start(
            calendar::shift_days(anchor, -(i64::from(current_streak) - 1)),
            zone,
        )
    });

    let summary = StreakSummary {
        streak_key: streak_key.to_string(),
        user_id: user_id.to_string(),
        current_streak,
        longest_streak,
        date_last_event: last_event.map(|e| e.created_at),
        last_event_timezone: last_event.map(|e| e.timezone.clone()),
        date_streak_start,
        total_events: events.len() as u32,
        freezes_available_count: available.len() as u32,
        freezes_available: available,
        date_created: events.iter().map(|e| e.created_at).min(),
        date_updated: now,
        events_required_per_day: config.events_required_per_day,
        today_event_count: days.get(&today).map_or(0, |tally| tally.total as u32),
        recent_events: recent::recent_events(
            events,
            |e| e.created_at,
            now,
            zone,
            config.leeway_hours,
        ),
    };

    StreakCalculation {
        summary,
        consumptions,
    }
}

fn blank_summary(
    user_id: &str,
    streak_key: &str,
    config: &StreakConfig,
    available: Vec<StreakFreeze>,
    now: DateTime<Utc>,
) -> StreakSummary {
    StreakSummary {
        streak_key: streak_key.to_string(),
        user_id: user_id.to_string(),
        current_streak: 0,
        longest_streak: 0,
        date_last_event: None,
        last_event_timezone: None,
        date_streak_start: None,
        total_events: 0,
        freezes_available_count: available.len() as u32,
        freezes_available: available,
        date_created: None,
        date_updated: now,
        events_required_per_day: config.events_required_per_day,
        today_event_count: 0,
        recent_events: Vec::new(),
    }
}
