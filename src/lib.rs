// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Streak-Tracker: daily GitHub commit activity and streaks
//!
//! This crate provides the backend API that pulls a user's push events from
//! GitHub, stores per-repository daily activity and daily totals, and
//! derives the user's current and longest commit streaks.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::ActivityStore;
use services::{GitHubOAuth, SyncService, TasksService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn ActivityStore>,
    pub oauth: GitHubOAuth,
    pub sync_service: SyncService,
    pub tasks_service: TasksService,
}
