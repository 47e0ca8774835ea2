// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task handler routes for Cloud Scheduler and Cloud Tasks callbacks.
//!
//! These endpoints are not called by users; `require_tasks_auth` guards
//! them (see routes/mod.rs).

use crate::error::Result;
use crate::services::tasks::{QueueResult, SyncUserPayload};
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use std::sync::Arc;

/// Task handler routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/sync-all", post(sync_all))
        .route("/tasks/sync-user", post(sync_user))
}

/// Fan out one sync task per known user (called by Cloud Scheduler).
async fn sync_all(State(state): State<Arc<AppState>>) -> Result<Json<QueueResult>> {
    let user_ids = state.db.list_user_ids().await?;

    tracing::info!(users = user_ids.len(), "Scheduling syncs for all users");

    let result = state
        .tasks_service
        .queue_scheduled_syncs(&state.config.api_url, user_ids)
        .await;

    if !result.is_complete_success() {
        tracing::warn!(
            queued = result.queued,
            failed = result.failed,
            failed_ids = ?result.failed_ids,
            "Some user syncs could not be queued"
        );
    }

    Ok(Json(result))
}

/// Sync one user's recent activity (called by Cloud Tasks).
///
/// Returns 500 only when a retry could help, so Cloud Tasks does not keep
/// retrying users whose GitHub credential is gone, or re-merge the commits a
/// timed-out sync already stored.
async fn sync_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SyncUserPayload>,
) -> StatusCode {
    let user_id = payload.user_id;

    match state.sync_service.sync_recent(user_id).await {
        Ok(summary) => {
            tracing::info!(
                user_id,
                saved = summary.saved,
                detail_failures = summary.detail_failures,
                "Scheduled sync finished"
            );
            StatusCode::OK
        }
        Err(e) if e.is_retryable() => {
            tracing::error!(user_id, error = %e, "Scheduled sync failed, will retry");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Scheduled sync failed permanently, not retrying");
            StatusCode::OK
        }
    }
}
