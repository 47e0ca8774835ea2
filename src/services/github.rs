// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub API client for listing push events and commit stats.
//!
//! Handles:
//! - Resolving the authenticated login
//! - Paging the user's recent events
//! - Per-commit line stats
//! - Rate limit and credential failure classification

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

/// Events per page requested from GitHub (the API maximum).
const EVENTS_PER_PAGE: u32 = 100;
/// GitHub only serves the most recent 300 events.
const MAX_EVENT_PAGES: u32 = 3;

pub(crate) const USER_AGENT: &str = "streak-tracker";

/// Failures talking to GitHub.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("GitHub rejected the access token")]
    Unauthorized,

    #[error("Not found on GitHub")]
    NotFound,

    #[error("GitHub rate limit exceeded")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unauthorized => {
                AppError::GitHubAuth("access token is invalid or revoked".to_string())
            }
            other => AppError::GitHubApi(other.to_string()),
        }
    }
}

/// Line stats for one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

/// One entry of the user's event feed. Only `PushEvent`s matter here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub repo: EventRepo,
    /// ISO 8601; left raw so one malformed event cannot fail the whole page
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub payload: EventPayload,
}

impl GitHubEvent {
    pub fn is_push(&self) -> bool {
        self.kind == "PushEvent"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRepo {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    /// Possibly truncated by GitHub (20 per push)
    #[serde(default)]
    pub commits: Vec<CommitRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// Authenticated user profile.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct CommitResponse {
    #[serde(default)]
    stats: Option<CommitStats>,
}

/// Upstream source of push events and commit details.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Recent events of the token's owner, newest first, reaching back at least
    /// to `since` when GitHub still has them. May include older events.
    async fn list_events(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<GitHubEvent>, UpstreamError>;

    /// Line stats of one commit.
    async fn get_commit_stats(
        &self,
        access_token: &str,
        repo_name: &str,
        sha: &str,
    ) -> Result<CommitStats, UpstreamError>;
}

/// GitHub REST client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the authenticated user's profile.
    pub async fn get_authenticated_user(
        &self,
        access_token: &str,
    ) -> Result<GitHubUser, UpstreamError> {
        let url = format!("{}/user", self.base_url);
        self.get_json(&url, access_token, &[]).await
    }

    /// One page of the user's events, undecoded.
    async fn list_events_page(
        &self,
        access_token: &str,
        login: &str,
        page: u32,
    ) -> Result<Vec<serde_json::Value>, UpstreamError> {
        let url = format!(
            "{}/users/{}/events",
            self.base_url,
            urlencoding::encode(login)
        );
        self.get_json(
            &url,
            access_token,
            &[
                ("per_page", EVENTS_PER_PAGE.to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let rate_limit_exhausted = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim() == "0");
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, rate_limit_exhausted, body));
        }

        response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

/// Decode a page event by event, dropping the ones that do not parse.
fn decode_events(raw: Vec<serde_json::Value>) -> Vec<GitHubEvent> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<GitHubEvent>(value) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping malformed GitHub event");
                None
            }
        })
        .collect()
}

/// Map a non-success response onto the upstream error taxonomy.
fn classify_failure(status: StatusCode, rate_limit_exhausted: bool, body: String) -> UpstreamError {
    match status {
        StatusCode::UNAUTHORIZED => UpstreamError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!("GitHub rate limit hit (429)");
            UpstreamError::RateLimited
        }
        StatusCode::FORBIDDEN if rate_limit_exhausted => {
            tracing::warn!("GitHub rate limit hit (403, remaining=0)");
            UpstreamError::RateLimited
        }
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => UpstreamError::NotFound,
        _ => UpstreamError::Http {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl EventSource for GitHubClient {
    async fn list_events(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<GitHubEvent>, UpstreamError> {
        let user = self.get_authenticated_user(access_token).await?;
        let mut events = Vec::new();

        for page in 1..=MAX_EVENT_PAGES {
            let raw = self.list_events_page(access_token, &user.login, page).await?;
            let batch_len = raw.len();
            let batch = decode_events(raw);

            // Events arrive newest first; once a page reaches past `since`
            // there is nothing newer left to fetch.
            let reached_since = batch
                .last()
                .and_then(|e| crate::time_utils::parse_timestamp(&e.created_at))
                .is_some_and(|oldest| oldest < since);

            events.extend(batch);

            if batch_len < EVENTS_PER_PAGE as usize || reached_since {
                break;
            }
        }

        tracing::debug!(
            login = %user.login,
            count = events.len(),
            "Fetched GitHub events"
        );
        Ok(events)
    }

    async fn get_commit_stats(
        &self,
        access_token: &str,
        repo_name: &str,
        sha: &str,
    ) -> Result<CommitStats, UpstreamError> {
        let (owner, repo) = repo_name.split_once('/').ok_or(UpstreamError::NotFound)?;
        let url = format!(
            "{}/repos/{}/{}/commits/{}",
            self.base_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            urlencoding::encode(sha)
        );

        let commit: CommitResponse = self.get_json(&url, access_token, &[]).await?;
        Ok(commit.stats.unwrap_or_default())
    }
}
