// SPDX-License-Identifier: MIT

//! Freeze selection policy.
//!
//! Freezes are spent oldest-first. The ordering must be total so that two
//! calculation runs over the same inventory always pick the same freezes.

use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;

use crate::models::StreakFreeze;

/// A freeze chosen to fill one missed local day.
#[derive(Debug, Clone, PartialEq)]
pub struct FreezeConsumption {
    pub freeze_id: String,
    pub day: NaiveDate,
}

/// FIFO comparison: ascending `earned_at`, freezes without an earn date
/// first, ties broken by `id`.
pub fn fifo_order(a: &StreakFreeze, b: &StreakFreeze) -> Ordering {
    match (a.earned_at, b.earned_at) {
        (None, None) => a.id.cmp(&b.id),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
    }
}

/// The freezes still consumable at `now`, in FIFO order.
pub fn available_fifo(freezes: &[StreakFreeze], now: DateTime<Utc>) -> Vec<StreakFreeze> {
    let mut available: Vec<StreakFreeze> = freezes
        .iter()
        .filter(|f| f.is_available(now))
        .cloned()
        .collect();
    available.sort_by(fifo_order);
    available
}

/// Pair gap days with freezes, oldest freeze to earliest day.
///
/// Pairs up the first `min(days, freezes)` of each. Whether a partial cover
/// is acceptable is the caller's decision; auto-consume requires full cover.
pub fn select_for_days(days: &[NaiveDate], available: &[StreakFreeze]) -> Vec<FreezeConsumption> {
    days.iter()
        .zip(available.iter())
        .map(|(&day, freeze)| FreezeConsumption {
            freeze_id: freeze.id.clone(),
            day,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn freeze(id: &str, earned_at: Option<&str>) -> StreakFreeze {
        StreakFreeze {
            id: id.to_string(),
            earned_at: earned_at.map(utc),
            used_at: None,
            expires_at: None,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn fifo_sorts_by_earn_date_then_id() {
        let freezes = vec![
            freeze("c", Some("2024-12-20T00:00:00Z")),
            freeze("b", Some("2024-12-10T00:00:00Z")),
            freeze("a", Some("2024-12-10T00:00:00Z")),
        ];
        let ordered = available_fifo(&freezes, utc("2025-01-01T00:00:00Z"));
        let ids: Vec<&str> = ordered.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn fifo_sorts_nulls_first() {
        let freezes = vec![
            freeze("b", Some("2024-12-01T00:00:00Z")),
            freeze("z", None),
            freeze("a", None),
        ];
        let ordered = available_fifo(&freezes, utc("2025-01-01T00:00:00Z"));
        let ids: Vec<&str> = ordered.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z", "b"]);
    }

    #[test]
    fn available_excludes_used_and_expired() {
        let mut used = freeze("used", Some("2024-12-01T00:00:00Z"));
        used.used_at = Some(utc("2024-12-15T00:00:00Z"));
        let mut expired = freeze("expired", Some("2024-12-02T00:00:00Z"));
        expired.expires_at = Some(utc("2024-12-31T00:00:00Z"));
        let good = freeze("good", Some("2024-12-03T00:00:00Z"));

        let ordered = available_fifo(
            &[used, expired, good],
            utc("2025-01-01T00:00:00Z"),
        );
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, "good");
    }

    #[test]
    fn select_pairs_oldest_freeze_with_earliest_day() {
        let available = vec![
            freeze("old", Some("2024-12-01T00:00:00Z")),
            freeze("new", Some("2024-12-20T00:00:00Z")),
        ];
        let days = vec![day("2025-01-02"), day("2025-01-03")];

        let picked = select_for_days(&days, &available);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].freeze_id, "old");
        assert_eq!(picked[0].day, day("2025-01-02"));
        assert_eq!(picked[1].freeze_id, "new");
        assert_eq!(picked[1].day, day("2025-01-03"));
    }

    #[test]
    fn select_truncates_to_shorter_side() {
        let available = vec![freeze("only", Some("2024-12-01T00:00:00Z"))];
        let days = vec![day("2025-01-02"), day("2025-01-03")];
        assert_eq!(select_for_days(&days, &available).len(), 1);
        assert_eq!(select_for_days(&[], &available).len(), 0);
    }
}
