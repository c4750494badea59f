// SPDX-License-Identifier: MIT

//! Per-streak and per-XP configuration supplied by callers.

use serde::{Deserialize, Serialize};

/// What the engine does with freezes when a gap appears in the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeBehavior {
    /// Freezes are ignored entirely.
    NoFreezes,
    /// Spend freezes automatically to close gaps, but only when the
    /// available freezes cover the whole gap.
    AutoConsume,
    /// Freezes are listed as available but only the client spends them.
    ManualConsume,
}

impl FreezeBehavior {
    /// Parse the wire string used in callable payloads and persisted docs.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "no_freezes" => Some(Self::NoFreezes),
            "auto_consume" => Some(Self::AutoConsume),
            "manual_consume" => Some(Self::ManualConsume),
            _ => None,
        }
    }
}

/// Streak configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakConfig {
    pub streak_id: String,
    /// How many events a local day needs before it counts toward the streak.
    pub events_required_per_day: u32,
    /// Whether the client defers calculation to the server callable.
    #[serde(default)]
    pub use_server_calculation: bool,
    /// Hours after local midnight during which "today" still counts as
    /// yesterday. 0 disables leeway.
    #[serde(default)]
    pub leeway_hours: i64,
    pub freeze_behavior: FreezeBehavior,
}

/// Experience-points configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpConfig {
    pub experience_id: String,
    #[serde(default)]
    pub use_server_calculation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeze_behavior_parses_wire_strings() {
        assert_eq!(FreezeBehavior::parse("no_freezes"), Some(FreezeBehavior::NoFreezes));
        assert_eq!(FreezeBehavior::parse("auto_consume"), Some(FreezeBehavior::AutoConsume));
        assert_eq!(
            FreezeBehavior::parse("manual_consume"),
            Some(FreezeBehavior::ManualConsume)
        );
        assert_eq!(FreezeBehavior::parse("AUTO_CONSUME"), None);
        assert_eq!(FreezeBehavior::parse(""), None);
    }

    #[test]
    fn freeze_behavior_serializes_as_snake_case() {
        let json = serde_json::to_string(&FreezeBehavior::AutoConsume).unwrap();
        assert_eq!(json, r#""auto_consume""#);
    }
}
