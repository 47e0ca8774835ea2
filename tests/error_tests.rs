// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::time::Duration;
use streak_tracker::error::AppError;
use streak_tracker::services::UpstreamError;

#[test]
fn test_upstream_unauthorized_maps_to_github_auth() {
    let err: AppError = UpstreamError::Unauthorized.into();
    assert!(matches!(err, AppError::GitHubAuth(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_other_upstream_failures_map_to_github_api() {
    for upstream in [
        UpstreamError::RateLimited,
        UpstreamError::NotFound,
        UpstreamError::Network("reset".to_string()),
        UpstreamError::Http {
            status: 503,
            body: "unavailable".to_string(),
        },
    ] {
        let err: AppError = upstream.into();
        assert!(matches!(err, AppError::GitHubApi(_)));
        assert!(err.is_retryable());
    }
}

#[test]
fn test_timed_out_sync_is_not_retried() {
    assert!(!AppError::SyncTimedOut(Duration::from_secs(120)).is_retryable());
}

#[test]
fn test_sub_second_timeout_is_reported_exactly() {
    let err = AppError::SyncTimedOut(Duration::from_millis(300));
    assert_eq!(err.to_string(), "Sync did not finish within 300ms");
}

#[test]
fn test_input_and_auth_errors_not_retryable() {
    assert!(!AppError::BadRequest("days".to_string()).is_retryable());
    assert!(!AppError::Unauthorized.is_retryable());
    assert!(!AppError::NotFound("user".to_string()).is_retryable());
    assert!(AppError::Database("down".to_string()).is_retryable());
}

#[test]
fn test_status_codes() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AppError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST),
        (AppError::GitHubAuth("x".to_string()), StatusCode::UNAUTHORIZED),
        (AppError::GitHubApi("x".to_string()), StatusCode::BAD_GATEWAY),
        (AppError::Database("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        (
            AppError::SyncTimedOut(Duration::from_secs(5)),
            StatusCode::GATEWAY_TIMEOUT,
        ),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}
