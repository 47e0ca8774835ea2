// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use streak_tracker::config::Config;
use streak_tracker::db::{ActivityStore, FirestoreDb, MemoryDb};
use streak_tracker::models::{User, UserTokens};
use streak_tracker::routes::create_router;
use streak_tracker::services::github::{
    CommitRef, CommitStats, EventPayload, EventRepo, EventSource, GitHubEvent, UpstreamError,
};
use streak_tracker::services::{GitHubClient, GitHubOAuth, SyncService, SyncSettings, TasksService};
use streak_tracker::time_utils::format_utc_rfc3339;
use streak_tracker::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Line stats the fake reports for every commit.
#[allow(dead_code)]
pub const FAKE_ADDITIONS: u64 = 10;
#[allow(dead_code)]
pub const FAKE_DELETIONS: u64 = 2;

/// Scripted GitHub: serves a fixed event list and uniform commit stats.
#[derive(Default)]
pub struct FakeGitHub {
    events: Mutex<Vec<GitHubEvent>>,
    failing_shas: Mutex<HashSet<String>>,
    listing_error: Mutex<Option<UpstreamError>>,
    pub list_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeGitHub {
    pub fn set_events(&self, events: Vec<GitHubEvent>) {
        *self.events.lock().unwrap() = events;
    }

    pub fn fail_commit(&self, sha: &str) {
        self.failing_shas.lock().unwrap().insert(sha.to_string());
    }

    pub fn fail_listing(&self, err: UpstreamError) {
        *self.listing_error.lock().unwrap() = Some(err);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for FakeGitHub {
    async fn list_events(
        &self,
        _access_token: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<GitHubEvent>, UpstreamError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.listing_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.events.lock().unwrap().clone())
    }

    async fn get_commit_stats(
        &self,
        _access_token: &str,
        _repo_name: &str,
        sha: &str,
    ) -> Result<CommitStats, UpstreamError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_shas.lock().unwrap().contains(sha) {
            return Err(UpstreamError::NotFound);
        }
        Ok(CommitStats {
            additions: FAKE_ADDITIONS,
            deletions: FAKE_DELETIONS,
        })
    }
}

/// A push event with the given commit SHAs.
#[allow(dead_code)]
pub fn push_event(repo: &str, created_at: DateTime<Utc>, shas: &[&str]) -> GitHubEvent {
    GitHubEvent {
        id: format!("{}-{}", repo, created_at.timestamp()),
        kind: "PushEvent".to_string(),
        repo: EventRepo {
            name: repo.to_string(),
        },
        created_at: format_utc_rfc3339(created_at),
        payload: EventPayload {
            commits: shas
                .iter()
                .map(|sha| CommitRef {
                    sha: sha.to_string(),
                })
                .collect(),
        },
    }
}

/// Parse an RFC3339 timestamp (test fixtures only).
#[allow(dead_code)]
pub fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap()
        .with_timezone(&Utc)
}

/// Everything a test needs to drive and inspect the app.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub github: Arc<FakeGitHub>,
}

/// Create a test app over an in-memory store and a scripted GitHub.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_db(MemoryDb::new())
}

#[allow(dead_code)]
pub fn create_test_app_with_db(db: MemoryDb) -> TestApp {
    let settings = SyncSettings::from(&Config::test_default());
    create_test_app_with_settings(db, settings)
}

/// Create a test app with custom sync tunables (e.g. a short timeout).
#[allow(dead_code)]
pub fn create_test_app_with_settings(db: MemoryDb, settings: SyncSettings) -> TestApp {
    let config = Config::test_default();
    let github = Arc::new(FakeGitHub::default());
    let store: Arc<dyn ActivityStore> = Arc::new(db.clone());

    let sync_service = SyncService::new(store.clone(), github.clone(), settings);
    let tasks_service = TasksService::new(&config.gcp_project_id, &config.gcp_region);
    let oauth = GitHubOAuth::new(
        &config,
        GitHubClient::new(&config.github_api_url).unwrap(),
    )
    .unwrap();

    let state = Arc::new(AppState {
        config,
        db: store,
        oauth,
        sync_service,
        tasks_service,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        github,
    }
}

/// Store a user with a GitHub credential.
#[allow(dead_code)]
pub async fn seed_user(db: &MemoryDb, user_id: u64) -> User {
    let user = User {
        github_id: user_id,
        username: format!("user{}", user_id),
        avatar_url: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        current_streak: 0,
        longest_streak: 0,
        last_synced_at: None,
    };
    db.upsert_user(&user).await.unwrap();
    db.set_tokens(
        user_id,
        &UserTokens {
            access_token: format!("gho_test_{}", user_id),
            scopes: vec!["read:user".to_string()],
        },
    )
    .await
    .unwrap();
    user
}

/// Create a valid session JWT for testing.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: u64, signing_key: &[u8]) -> String {
    streak_tracker::middleware::auth::create_jwt(user_id, signing_key).unwrap()
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
