// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::config::{MAX_SYNC_DAYS, MIN_SYNC_DAYS, RECENT_SYNC_DAYS};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Activity, ActivityFilter, DailyStat, DateRange, StreakSummary};
use crate::services::SyncSummary;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const DEFAULT_ACTIVITY_LIMIT: usize = 50;
const MAX_ACTIVITY_LIMIT: usize = 500;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/github/sync", post(sync_recent))
        .route("/api/github/fetch", post(fetch_range))
        .route("/api/streak", get(get_streak))
        .route("/api/streak/calculate", post(calculate_streak))
        .route("/api/stats/daily", get(get_daily_stats))
        .route("/api/activities", get(get_activities))
}

/// The `days` days ending on `today`, inclusive.
fn trailing_days(today: NaiveDate, days: u32) -> DateRange {
    let from = today
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN);
    DateRange { from, to: today }
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_synced_at: Option<String>,
}

/// Get current user profile with stored streak fields.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .db
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(UserResponse {
        user_id: profile.github_id,
        username: profile.username,
        avatar_url: profile.avatar_url,
        current_streak: profile.current_streak,
        longest_streak: profile.longest_streak,
        last_synced_at: profile.last_synced_at,
    }))
}

// ─── Sync ────────────────────────────────────────────────────

/// Sync the last 30 days.
async fn sync_recent(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SyncSummary>> {
    tracing::info!(user_id = user.user_id, "Manual sync requested");

    let summary = state.sync_service.sync_recent(user.user_id).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize, Validate)]
struct FetchRequest {
    #[validate(range(min = MIN_SYNC_DAYS, max = MAX_SYNC_DAYS))]
    days: u32,
}

/// Sync a caller-chosen window of days.
async fn fetch_range(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    request: std::result::Result<Json<FetchRequest>, JsonRejection>,
) -> Result<Json<SyncSummary>> {
    let Json(request) = request?;
    request.validate().map_err(|_| {
        AppError::BadRequest(format!(
            "Days must be between {} and {}",
            MIN_SYNC_DAYS, MAX_SYNC_DAYS
        ))
    })?;

    tracing::info!(user_id = user.user_id, days = request.days, "Range sync requested");

    let summary = state
        .sync_service
        .sync_range(user.user_id, request.days)
        .await?;
    Ok(Json(summary))
}

// ─── Streaks ─────────────────────────────────────────────────

/// One active day in the streak details.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActiveDay {
    pub date: NaiveDate,
    pub commits: u32,
}

/// Streak details response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakResponse {
    #[serde(flatten)]
    pub streak: StreakSummary,
    /// Days with commits in the last 30 days, oldest first
    pub recent_active_days: Vec<ActiveDay>,
}

/// Current streak plus the recent active days, computed from stored stats.
async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StreakResponse>> {
    let streak = state.sync_service.compute_streak(user.user_id).await?;

    let window = trailing_days(state.sync_service.today(), RECENT_SYNC_DAYS);
    let recent_active_days = state
        .db
        .get_daily_stats(user.user_id, Some(window))
        .await?
        .into_iter()
        .filter(DailyStat::is_active)
        .map(|s| ActiveDay {
            date: s.stat_date,
            commits: s.total_commits,
        })
        .collect();

    Ok(Json(StreakResponse {
        streak,
        recent_active_days,
    }))
}

/// Recompute and store the user's streak without syncing.
async fn calculate_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StreakSummary>> {
    let today = state.sync_service.today();
    let streak = state
        .sync_service
        .update_user_streak(user.user_id, today)
        .await?;
    Ok(Json(streak))
}

// ─── Daily Stats ─────────────────────────────────────────────

#[derive(Deserialize)]
struct DailyStatsQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

/// Daily totals response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailyStatsResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub stats: Vec<DailyStat>,
}

/// Get daily totals in a date range (default: the last 30 days).
async fn get_daily_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    params: std::result::Result<Query<DailyStatsQuery>, QueryRejection>,
) -> Result<Json<DailyStatsResponse>> {
    let Query(params) = params?;
    let default_window = trailing_days(state.sync_service.today(), RECENT_SYNC_DAYS);
    let range = DateRange {
        from: params.from.unwrap_or(default_window.from),
        to: params.to.unwrap_or(default_window.to),
    };

    if range.from > range.to {
        return Err(AppError::BadRequest(
            "'from' must not be after 'to'".to_string(),
        ));
    }

    let stats = state.db.get_daily_stats(user.user_id, Some(range)).await?;

    Ok(Json(DailyStatsResponse {
        from: range.from,
        to: range.to,
        stats,
    }))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivitiesQuery {
    /// Filter by full repository name
    repo: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_ACTIVITY_LIMIT
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<Activity>,
    pub limit: usize,
}

/// Get the user's activity rows, newest day first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    params: std::result::Result<Query<ActivitiesQuery>, QueryRejection>,
) -> Result<Json<ActivitiesResponse>> {
    let Query(params) = params?;
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(AppError::BadRequest(
                "'from' must not be after 'to'".to_string(),
            ));
        }
    }

    let limit = params.limit.clamp(1, MAX_ACTIVITY_LIMIT);

    tracing::debug!(
        user_id = user.user_id,
        repo = ?params.repo,
        from = ?params.from,
        to = ?params.to,
        limit,
        "Fetching activities"
    );

    let filter = ActivityFilter {
        repo_name: params.repo.filter(|r| !r.trim().is_empty()),
        from: params.from,
        to: params.to,
        limit: Some(limit),
    };
    let activities = state.db.query_activities(user.user_id, &filter).await?;

    Ok(Json(ActivitiesResponse { activities, limit }))
}
