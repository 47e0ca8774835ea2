// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP tests for the GitHub login flow.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Utc;
use streak_tracker::db::ActivityStore;
use streak_tracker::routes::auth::{sign_state, verify_state};
use tower::ServiceExt;

mod common;
use common::{create_test_app, TestApp};

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn fresh_state(app: &TestApp, frontend_url: &str) -> String {
    sign_state(
        frontend_url,
        Utc::now().timestamp_millis(),
        &app.state.config.oauth_state_key,
    )
    .unwrap()
}

async fn get(app: &TestApp, uri: &str) -> axum::response::Response {
    app.router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Pull the `state` query value back out of the authorize redirect.
fn state_param(url: &str) -> String {
    let raw = url.split("state=").nth(1).unwrap();
    urlencoding::decode(raw).unwrap().into_owned()
}

#[tokio::test]
async fn test_login_redirects_to_github() {
    let app = create_test_app();

    let response = get(&app, "/auth/github").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let url = location(&response);
    assert!(url.starts_with("http://127.0.0.1:9/login/oauth/authorize?client_id=test_client_id"));
    assert!(url.contains("auth%2Fgithub%2Fcallback"));

    let frontend = verify_state(
        &state_param(&url),
        &app.state.config.oauth_state_key,
        Utc::now().timestamp_millis(),
    );
    assert_eq!(frontend.as_deref(), Some("http://localhost:5173"));
}

#[tokio::test]
async fn test_login_ignores_foreign_redirect_uri() {
    let app = create_test_app();

    let response = get(&app, "/auth/github?redirect_uri=https%3A%2F%2Fevil.example").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let frontend = verify_state(
        &state_param(&location(&response)),
        &app.state.config.oauth_state_key,
        Utc::now().timestamp_millis(),
    );
    assert_eq!(frontend.as_deref(), Some("http://localhost:5173"));
}

#[tokio::test]
async fn test_login_keeps_local_redirect_uri() {
    let app = create_test_app();

    let response = get(&app, "/auth/github?redirect_uri=http%3A%2F%2Flocalhost%3A3000").await;

    let frontend = verify_state(
        &state_param(&location(&response)),
        &app.state.config.oauth_state_key,
        Utc::now().timestamp_millis(),
    );
    assert_eq!(frontend.as_deref(), Some("http://localhost:3000"));
}

#[tokio::test]
async fn test_callback_with_forged_state_stores_nothing() {
    let app = create_test_app();

    let response = get(&app, "/auth/github/callback?code=abc&state=forged").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "http://localhost:5173?error=invalid_state"
    );
    assert!(app.db.list_user_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_passes_github_error_to_frontend() {
    let app = create_test_app();
    let state = fresh_state(&app, "http://localhost:3000");
    let uri = format!(
        "/auth/github/callback?error=access_denied&state={}",
        urlencoding::encode(&state)
    );

    let response = get(&app, &uri).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "http://localhost:3000?error=access_denied"
    );
}

#[tokio::test]
async fn test_callback_without_code_is_bad_request() {
    let app = create_test_app();
    let state = fresh_state(&app, "http://localhost:5173");
    let uri = format!("/auth/github/callback?state={}", urlencoding::encode(&state));

    let response = get(&app, &uri).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_clears_session_cookie() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/logout")
                .header(header::COOKIE, "streak_token=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "http://localhost:5173");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("streak_token="));
}
