// SPDX-License-Identifier: MIT

//! Timezone-aware calendar arithmetic.
//!
//! Every streak and window computation reduces to "which local calendar day
//! does this instant fall on" for some IANA zone. Days are keyed by
//! [`NaiveDate`] so that DST transitions (23- and 25-hour days, skipped
//! midnights) can never split one local day into two buckets.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// The local calendar day containing `instant` in `zone`.
pub fn local_day(instant: DateTime<Utc>, zone: Tz) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

/// The instant at which `date` begins in `zone`.
///
/// On days where a DST transition removes midnight the day starts when the
/// clock resumes, so the first valid wall time after 00:00 is used.
pub fn day_start(date: NaiveDate, zone: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match zone.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => (1..=48)
            .find_map(|i| {
                let probe = midnight + Duration::minutes(30 * i);
                zone.from_local_datetime(&probe).earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
    }
}

/// The instant that represents 00:00:00 local time in `zone` on the calendar
/// day that contains `instant`.
pub fn start_of_day(instant: DateTime<Utc>, zone: Tz) -> DateTime<Utc> {
    day_start(local_day(instant, zone), zone)
}

/// Whether `a` and `b` fall on the same local calendar day in `zone`.
pub fn same_day(a: DateTime<Utc>, b: DateTime<Utc>, zone: Tz) -> bool {
    local_day(a, zone) == local_day(b, zone)
}

/// Whole-day difference between the local days containing `a` and `b`.
///
/// Positive when `b` is on a later day. DST-shortened and -lengthened days
/// count as exactly one day.
pub fn days_between(a: DateTime<Utc>, b: DateTime<Utc>, zone: Tz) -> i64 {
    local_day(b, zone)
        .signed_duration_since(local_day(a, zone))
        .num_days()
}

/// Floored wall-time difference in whole hours. No timezone involved.
pub fn hours_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (b - a).num_hours()
}

/// `date` shifted by `days` calendar days. Saturates at the calendar limits.
pub fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(date)
}

/// The Sunday-through-Saturday week containing `instant`, as inclusive
/// instant endpoints (Sunday 00:00 local through the last millisecond before
/// the next Sunday begins).
pub fn week_interval(instant: DateTime<Utc>, zone: Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let day = local_day(instant, zone);
    let back = i64::from(day.weekday().num_days_from_sunday());
    let sunday = day.checked_sub_signed(Duration::days(back))?;
    let next_sunday = sunday.checked_add_signed(Duration::days(7))?;
    Some(bounded(sunday, next_sunday, zone))
}

/// The calendar month containing `instant`, as inclusive instant endpoints.
///
/// The end is derived by stepping to the first of the next month, which
/// sidesteps month-length arithmetic entirely.
pub fn month_interval(instant: DateTime<Utc>, zone: Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let day = local_day(instant, zone);
    let first = day.with_day(1)?;
    let next_first = if day.month() == 12 {
        NaiveDate::from_ymd_opt(day.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(day.year(), day.month() + 1, 1)?
    };
    Some(bounded(first, next_first, zone))
}

/// The calendar year containing `instant`, as inclusive instant endpoints.
pub fn year_interval(instant: DateTime<Utc>, zone: Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let day = local_day(instant, zone);
    let first = NaiveDate::from_ymd_opt(day.year(), 1, 1)?;
    let next_first = NaiveDate::from_ymd_opt(day.year() + 1, 1, 1)?;
    Some(bounded(first, next_first, zone))
}

/// Inclusive interval from the start of `from` to the last millisecond
/// before `until` begins.
fn bounded(from: NaiveDate, until: NaiveDate, zone: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        day_start(from, zone),
        day_start(until, zone) - Duration::milliseconds(1),
    )
}
