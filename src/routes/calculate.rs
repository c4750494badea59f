// SPDX-License-Identifier: MIT

//! The two callable entry points.
//!
//! Request shapes match the client SDKs: camelCase at the top level,
//! lower_snake_case inside `configuration`. Validation happens here so every
//! bad input surfaces as a structured `invalid_argument` instead of a
//! framework rejection.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{FreezeBehavior, StreakConfig, XpConfig};
use crate::services::{StreakProcessor, XpProcessor};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/calculate-streak", post(calculate_streak))
        .route(
            "/v1/calculate-experience-points",
            post(calculate_experience_points),
        )
}

/// Callable response; failures use the structured error body instead.
#[derive(Serialize)]
pub struct CalculateResponse {
    pub success: bool,
}

// ─── calculateStreak ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateStreakRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    streak_key: Option<String>,
    #[serde(default)]
    configuration: Option<StreakConfigPayload>,
    #[serde(default)]
    root_collection_name: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreakConfigPayload {
    #[serde(default)]
    streak_id: Option<String>,
    #[serde(default)]
    events_required_per_day: Option<i64>,
    #[serde(default)]
    use_server_calculation: Option<bool>,
    #[serde(default)]
    leeway_hours: Option<i64>,
    #[serde(default)]
    freeze_behavior: Option<String>,
}

async fn calculate_streak(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CalculateStreakRequest>, JsonRejection>,
) -> Result<Json<CalculateResponse>> {
    let Json(request) = payload.map_err(|err| AppError::InvalidArgument(err.body_text()))?;

    let user_id = required(request.user_id, "userId")?;
    let streak_key = required(request.streak_key, "streakKey")?;
    let configuration = request
        .configuration
        .ok_or_else(|| AppError::InvalidArgument("missing configuration".to_string()))?;
    let config = validate_streak_config(configuration, &streak_key)?;
    let zone = parse_zone(request.timezone.as_deref())?;
    let root = request
        .root_collection_name
        .unwrap_or_else(|| state.config.root_collection.clone());

    tracing::info!(
        user_id = %user_id,
        streak_key = %streak_key,
        freeze_behavior = ?config.freeze_behavior,
        "Calculating streak"
    );

    let repo = state.store.streak_repository(&root, &user_id, &streak_key);
    let summary = StreakProcessor::new(repo)
        .run(&user_id, &streak_key, &config, zone)
        .await?;

    tracing::info!(
        user_id = %user_id,
        streak_key = %streak_key,
        current_streak = summary.current_streak,
        "Streak calculated"
    );

    Ok(Json(CalculateResponse { success: true }))
}

fn validate_streak_config(
    payload: StreakConfigPayload,
    streak_key: &str,
) -> Result<StreakConfig> {
    let events_required_per_day = payload.events_required_per_day.unwrap_or(1);
    if events_required_per_day < 1 {
        return Err(AppError::InvalidArgument(
            "events_required_per_day must be positive".to_string(),
        ));
    }

    let leeway_hours = payload.leeway_hours.unwrap_or(0);
    if !(0..=23).contains(&leeway_hours) {
        return Err(AppError::InvalidArgument(
            "leeway_hours must be between 0 and 23".to_string(),
        ));
    }

    let freeze_behavior = match payload.freeze_behavior.as_deref() {
        None => FreezeBehavior::NoFreezes,
        Some(value) => FreezeBehavior::parse(value).ok_or_else(|| {
            AppError::InvalidArgument(format!("unknown freeze_behavior '{}'", value))
        })?,
    };

    Ok(StreakConfig {
        streak_id: payload
            .streak_id
            .unwrap_or_else(|| streak_key.to_string()),
        events_required_per_day: events_required_per_day as u32,
        use_server_calculation: payload.use_server_calculation.unwrap_or(true),
        leeway_hours,
        freeze_behavior,
    })
}

// ─── calculateExperiencePoints ───────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateXpRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    experience_key: Option<String>,
    #[serde(default)]
    configuration: Option<XpConfigPayload>,
    #[serde(default)]
    root_collection_name: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct XpConfigPayload {
    #[serde(default)]
    experience_id: Option<String>,
    #[serde(default)]
    use_server_calculation: Option<bool>,
}

async fn calculate_experience_points(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CalculateXpRequest>, JsonRejection>,
) -> Result<Json<CalculateResponse>> {
    let Json(request) = payload.map_err(|err| AppError::InvalidArgument(err.body_text()))?;

    let user_id = required(request.user_id, "userId")?;
    let experience_key = required(request.experience_key, "experienceKey")?;
    let configuration = request
        .configuration
        .ok_or_else(|| AppError::InvalidArgument("missing configuration".to_string()))?;
    let config = XpConfig {
        experience_id: configuration
            .experience_id
            .unwrap_or_else(|| experience_key.clone()),
        use_server_calculation: configuration.use_server_calculation.unwrap_or(true),
    };
    let zone = parse_zone(request.timezone.as_deref())?;
    let root = request
        .root_collection_name
        .unwrap_or_else(|| state.config.root_collection.clone());

    let repo = state.store.xp_repository(&root, &user_id, &experience_key);
    let summary = XpProcessor::new(repo)
        .run(&user_id, &experience_key, &config, zone)
        .await?;

    tracing::info!(
        user_id = %user_id,
        experience_key = %experience_key,
        points_all_time = summary.points_all_time,
        "Experience points calculated"
    );

    Ok(Json(CalculateResponse { success: true }))
}

// ─── Shared validation ───────────────────────────────────────

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::InvalidArgument(format!("missing {}", name))),
    }
}

fn parse_zone(timezone: Option<&str>) -> Result<Option<Tz>> {
    timezone
        .map(|name| {
            name.parse::<Tz>().map_err(|_| {
                AppError::InvalidArgument(format!("unrecognized timezone '{}'", name))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_blank() {
        assert!(required(None, "userId").is_err());
        assert!(required(Some("  ".to_string()), "userId").is_err());
        assert_eq!(required(Some("u1".to_string()), "userId").unwrap(), "u1");
    }

    #[test]
    fn parse_zone_accepts_iana_names() {
        assert!(parse_zone(None).unwrap().is_none());
        assert_eq!(
            parse_zone(Some("Europe/Berlin")).unwrap().unwrap().name(),
            "Europe/Berlin"
        );
        assert!(parse_zone(Some("Not/A_Zone")).is_err());
    }

    #[test]
    fn config_validation_defaults_and_bounds() {
        let payload = StreakConfigPayload {
            streak_id: None,
            events_required_per_day: None,
            use_server_calculation: None,
            leeway_hours: None,
            freeze_behavior: None,
        };
        let config = validate_streak_config(payload, "workout").unwrap();
        assert_eq!(config.streak_id, "workout");
        assert_eq!(config.events_required_per_day, 1);
        assert_eq!(config.leeway_hours, 0);
        assert_eq!(config.freeze_behavior, FreezeBehavior::NoFreezes);

        let bad_goal = StreakConfigPayload {
            streak_id: None,
            events_required_per_day: Some(0),
            use_server_calculation: None,
            leeway_hours: None,
            freeze_behavior: None,
        };
        assert!(validate_streak_config(bad_goal, "workout").is_err());

        let bad_leeway = StreakConfigPayload {
            streak_id: None,
            events_required_per_day: Some(1),
            use_server_calculation: None,
            leeway_hours: Some(24),
            freeze_behavior: None,
        };
        assert!(validate_streak_config(bad_leeway, "workout").is_err());

        let bad_behavior = StreakConfigPayload {
            streak_id: None,
            events_required_per_day: Some(1),
            use_server_calculation: None,
            leeway_hours: Some(0),
            freeze_behavior: Some("sometimes".to_string()),
        };
        assert!(validate_streak_config(bad_behavior, "workout").is_err());
    }
}
