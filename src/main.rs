// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Streak-Tracker API Server
//!
//! Syncs GitHub push activity into daily totals and tracks commit streaks.

use std::sync::Arc;
use streak_tracker::{
    config::{Config, StoreBackend},
    db::{ActivityStore, FirestoreDb, MemoryDb},
    services::{GitHubClient, GitHubOAuth, SyncService, SyncSettings, TasksService},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Streak-Tracker API");

    let db: Arc<dyn ActivityStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let github = GitHubClient::new(&config.github_api_url).expect("Failed to build GitHub client");
    tracing::info!(
        api = %config.github_api_url,
        day_boundary = %config.day_boundary,
        commit_detail_limit = config.commit_detail_limit,
        "GitHub client initialized"
    );

    let oauth =
        GitHubOAuth::new(&config, github.clone()).expect("Failed to build GitHub OAuth client");
    let sync_service = SyncService::new(db.clone(), Arc::new(github), SyncSettings::from(&config));

    // Initialize Cloud Tasks service
    let tasks_service = TasksService::new(&config.gcp_project_id, &config.gcp_region);
    tracing::info!(
        project = %config.gcp_project_id,
        "Cloud Tasks service initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        oauth,
        sync_service,
        tasks_service,
    });

    // Build router
    let app = streak_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("streak_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
