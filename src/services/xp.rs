//! The experience-points aggregator.
//!
//! Pure like the streak calculator: all windowed totals derive from the
//! event list and the supplied `now`. Calendar windows (week, month, year)
//! follow the local calendar in `zone`; rolling windows (7 days, 30 days,
//! 12 months) are plain wall-time subtraction and never look at the zone.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::calendar;
use crate::models::{XpConfig, XpEvent, XpSummary};
use crate::services::recent;

/// Compute a fresh XP summary from the full event log.
pub fn calculate_xp(
    events: &[XpEvent],
    _config: &XpConfig,
    user_id: &str,
    experience_key: &str,
    now: DateTime<Utc>,
    zone: Tz,
) -> XpSummary {
    if events.is_empty() {
        return XpSummary {
            experience_key: experience_key.to_string(),
            user_id: user_id.to_string(),
            points_all_time: 0,
            points_today: 0,
            events_today_count: 0,
            points_this_week: 0,
            points_last_7_days: 0,
            points_this_month: 0,
            points_last_30_days: 0,
            points_this_year: 0,
            points_last_12_months: 0,
            date_last_event: None,
            date_created: None,
            date_updated: now,
            recent_events: Vec::new(),
        };
    }

    // Ascending order keeps date_created deterministic when ids collide on
    // the same timestamp.
    let mut ordered: Vec<&XpEvent> = events.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let today: Vec<&&XpEvent> = ordered
        .iter()
        .filter(|e| calendar::same_day(e.created_at, now, zone))
        .collect();

    XpSummary {
        experience_key: experience_key.to_string(),
        user_id: user_id.to_string(),
        points_all_time: ordered.iter().map(|e| e.points).sum(),
        points_today: today.iter().map(|e| e.points).sum(),
        events_today_count: today.len() as u32,
        points_this_week: calendar_window(&ordered, calendar::week_interval(now, zone), now),
        points_last_7_days: rolling_window(&ordered, now, Duration::days(7)),
        points_this_month: calendar_window(&ordered, calendar::month_interval(now, zone), now),
        points_last_30_days: rolling_window(&ordered, now, Duration::days(30)),
        points_this_year: calendar_window(&ordered, calendar::year_interval(now, zone), now),
        points_last_12_months: rolling_window(&ordered, now, Duration::days(365)),
        date_last_event: ordered.last().map(|e| e.created_at),
        date_created: ordered.first().map(|e| e.created_at),
        date_updated: now,
        recent_events: recent::recent_events(events, |e| e.created_at, now, zone, 0),
    }
}

/// Sum of events inside a calendar interval, from its start through `now`.
/// A missing interval contributes zero.
fn calendar_window(
    ordered: &[&XpEvent],
    interval: Option<(DateTime<Utc>, DateTime<Utc>)>,
    now: DateTime<Utc>,
) -> i64 {
    interval.map_or(0, |(start, _)| {
        ordered
            .iter()
            .filter(|e| e.created_at >= start && e.created_at <= now)
            .map(|e| e.points)
            .sum()
    })
}

/// Sum of events with `created_at >= now - window`. Zone-free.
fn rolling_window(ordered: &[&XpEvent], now: DateTime<Utc>, window: Duration) -> i64 {
    let cutoff = now - window;
    ordered
        .iter()
        .filter(|e| e.created_at >= cutoff)
        .map(|e| e.points)
        .sum()
}
