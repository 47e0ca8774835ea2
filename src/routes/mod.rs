// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod api;
pub mod auth;
pub mod tasks;

use crate::middleware::{require_auth, require_tasks_auth};
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// The configured frontend, or a local dev server.
pub fn is_allowed_origin(origin: &str, frontend_url: &str) -> bool {
    if origin == frontend_url {
        return true;
    }
    ["http://localhost", "http://127.0.0.1"].iter().any(|host| {
        origin
            .strip_prefix(host)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(':') || rest.starts_with('/'))
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                is_allowed_origin(origin.to_str().unwrap_or(""), &frontend_url)
            },
        ))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes());

    // Session-authenticated user API
    let protected_routes =
        api::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Scheduler / Cloud Tasks callbacks
    let task_routes = tasks::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_tasks_auth,
    ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(task_routes)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins() {
        let frontend = "https://streaks.example.com";
        assert!(is_allowed_origin(frontend, frontend));
        assert!(is_allowed_origin("http://localhost", frontend));
        assert!(is_allowed_origin("http://localhost:5173", frontend));
        assert!(is_allowed_origin("http://127.0.0.1:8080/app", frontend));

        assert!(!is_allowed_origin("http://localhost.evil.example", frontend));
        assert!(!is_allowed_origin("https://streaks.example.com.evil.example", frontend));
        assert!(!is_allowed_origin("", frontend));
    }
}
