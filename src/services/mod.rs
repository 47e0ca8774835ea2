// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregate;
pub mod commit_details;
pub mod github;
pub mod normalize;
pub mod oauth;
pub mod streak;
pub mod sync;
pub mod tasks;

pub use aggregate::ActivityAggregator;
pub use commit_details::CommitDetailFetcher;
pub use github::{EventSource, GitHubClient, UpstreamError};
pub use oauth::{GitHubOAuth, OAuthResult};
pub use streak::{calculate_streak, StreakCalculator};
pub use sync::{SyncService, SyncSettings, SyncSummary};
pub use tasks::TasksService;
