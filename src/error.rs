// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The user's GitHub credential is missing, invalid or revoked.
    #[error("GitHub authorization failed: {0}")]
    GitHubAuth(String),

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Sync did not finish within {0:?}")]
    SyncTimedOut(Duration),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether a background retry of the failed operation could succeed.
    ///
    /// Credential and input problems need user action. A timed-out sync has
    /// already stored part of its merges, and merging is not idempotent, so
    /// running it again would count those commits twice.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AppError::Unauthorized
                | AppError::InvalidToken
                | AppError::NotFound(_)
                | AppError::BadRequest(_)
                | AppError::GitHubAuth(_)
                | AppError::SyncTimedOut(_)
        )
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::GitHubAuth(msg) => (
                StatusCode::UNAUTHORIZED,
                "github_auth_error",
                Some(msg.clone()),
            ),
            AppError::GitHubApi(msg) => {
                (StatusCode::BAD_GATEWAY, "github_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::SyncTimedOut(limit) => (
                StatusCode::GATEWAY_TIMEOUT,
                "sync_timeout",
                Some(format!("Sync exceeded {:?}; partial progress was kept", limit)),
            ),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
