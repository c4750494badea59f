// SPDX-License-Identifier: MIT

//! The 60-day recent-events window shared by both summary kinds.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;

use crate::calendar;

/// How many local days of history the summaries carry.
pub const RECENT_WINDOW_DAYS: i64 = 60;

/// Events from the last [`RECENT_WINDOW_DAYS`] local days, ascending by
/// creation time.
///
/// With `leeway_hours > 0`, events logged within the leeway window right
/// after a local midnight group under the *previous* day. The grouping only
/// decides which days survive the cut; emitted events keep their original
/// `created_at`. An extra remapped day can push the distinct-day count to 61,
/// in which case the oldest day is dropped.
pub fn recent_events<E, F>(
    events: &[E],
    created_at: F,
    now: DateTime<Utc>,
    zone: Tz,
    leeway_hours: i64,
) -> Vec<E>
where
    E: Clone,
    F: Fn(&E) -> DateTime<Utc>,
{
    let today = calendar::local_day(now, zone);
    let window_start = calendar::day_start(
        calendar::shift_days(today, -(RECENT_WINDOW_DAYS - 1)),
        zone,
    );

    let mapped: Vec<(NaiveDate, &E)> = events
        .iter()
        .filter(|e| created_at(e) >= window_start)
        .map(|e| (grouping_day(created_at(e), zone, leeway_hours), e))
        .collect();

    let mut days: BTreeSet<NaiveDate> = mapped.iter().map(|(day, _)| *day).collect();
    while days.len() > RECENT_WINDOW_DAYS as usize {
        days.pop_first();
    }

    let mut out: Vec<E> = mapped
        .into_iter()
        .filter(|(day, _)| days.contains(day))
        .map(|(_, e)| e.clone())
        .collect();
    out.sort_by_key(|e| created_at(e));
    out
}

/// The local day an event groups under, after the leeway remap.
fn grouping_day(at: DateTime<Utc>, zone: Tz, leeway_hours: i64) -> NaiveDate {
    let day = calendar::local_day(at, zone);
    if leeway_hours > 0 && calendar::hours_between(calendar::day_start(day, zone), at) <= leeway_hours
    {
        calendar::shift_days(day, -1)
    } else {
        day
    }
}
