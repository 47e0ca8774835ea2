// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication for `/tasks/*` routes.
//!
//! Two callers are accepted:
//! - Cloud Tasks, identified by the `x-cloudtasks-queuename` header naming
//!   our queue (Cloud Run strips this header from external requests)
//! - Cloud Scheduler, presenting `Authorization: Bearer {SCHEDULER_SECRET}`

use crate::config::SYNC_QUEUE_NAME;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const QUEUE_NAME_HEADER: &str = "x-cloudtasks-queuename";

pub async fn require_tasks_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if is_our_queue(request.headers()) {
        return Ok(next.run(request).await);
    }

    if has_scheduler_secret(request.headers(), &state.config.scheduler_secret) {
        tracing::debug!(path = %request.uri().path(), "Scheduler request authorized");
        return Ok(next.run(request).await);
    }

    tracing::warn!(
        path = %request.uri().path(),
        queue_header = ?request.headers().get(QUEUE_NAME_HEADER),
        "Blocked unauthorized tasks request"
    );
    Err(StatusCode::FORBIDDEN)
}

fn is_our_queue(headers: &HeaderMap) -> bool {
    headers
        .get(QUEUE_NAME_HEADER)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|name| name == SYNC_QUEUE_NAME)
}

fn has_scheduler_secret(headers: &HeaderMap, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .is_some_and(|presented| bool::from(presented.as_bytes().ct_eq(secret.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn queue_header_must_name_our_queue() {
        let mut headers = HeaderMap::new();
        assert!(!is_our_queue(&headers));

        headers.insert(QUEUE_NAME_HEADER, HeaderValue::from_static("other-queue"));
        assert!(!is_our_queue(&headers));

        headers.insert(QUEUE_NAME_HEADER, HeaderValue::from_static(SYNC_QUEUE_NAME));
        assert!(is_our_queue(&headers));
    }

    #[test]
    fn scheduler_secret_must_match_exactly() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));

        assert!(has_scheduler_secret(&headers, "s3cret"));
        assert!(!has_scheduler_secret(&headers, "s3cret-longer"));
        assert!(!has_scheduler_secret(&headers, ""));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("s3cret"));
        assert!(!has_scheduler_secret(&headers, "s3cret"));
    }
}
