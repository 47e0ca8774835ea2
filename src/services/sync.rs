// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync orchestration for one user over a lookback window.
//!
//! Handles the core workflow:
//! 1. Read the user's GitHub credential
//! 2. List recent events (failure here aborts the sync)
//! 3. Normalize push events into (repo, day) buckets
//! 4. Resolve line stats for a bounded set of commits per push
//! 5. Merge each bucket into its activity row
//! 6. Recompute the daily stat of every touched day
//! 7. Recompute and store the user's streak
//!
//! Steps 4-7 are best effort: a failed item is logged and skipped. Steps
//! 5-7 run under a per-user lock because merging is read-modify-write.
//! Re-syncing an overlapping window adds the overlapping commits again.

use crate::config::{Config, MAX_SYNC_DAYS, MIN_SYNC_DAYS, RECENT_SYNC_DAYS};
use crate::db::ActivityStore;
use crate::error::{AppError, Result};
use crate::models::{Activity, StreakSummary, User};
use crate::services::aggregate::ActivityAggregator;
use crate::services::commit_details::CommitDetailFetcher;
use crate::services::github::{EventSource, GitHubUser};
use crate::services::normalize::normalize_events;
use crate::services::streak::StreakCalculator;
use crate::time_utils::{day_of, format_utc_rfc3339, window_start};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-user mutex serializing syncs and streak writes.
pub type SyncLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

/// Tunables of the sync pipeline.
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub day_boundary: FixedOffset,
    pub commit_detail_limit: usize,
    pub timeout: Duration,
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            day_boundary: config.day_boundary,
            commit_detail_limit: config.commit_detail_limit,
            timeout: Duration::from_secs(config.sync_timeout_secs),
        }
    }
}

/// Outcome of one sync.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncSummary {
    /// (repo, day) buckets observed upstream
    pub fetched: usize,
    /// Buckets merged into stored activity rows
    pub saved: usize,
    /// The merged rows, as stored
    pub activities: Vec<Activity>,
    /// Commit detail lookups that failed (counted as zero lines)
    pub detail_failures: u32,
    /// Recomputed streak; absent if storing it failed
    pub streak: Option<StreakSummary>,
}

/// Reject windows outside `MIN_SYNC_DAYS..=MAX_SYNC_DAYS` before any I/O.
pub fn validate_sync_days(days: u32) -> Result<()> {
    if (MIN_SYNC_DAYS..=MAX_SYNC_DAYS).contains(&days) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Days must be between {} and {}",
            MIN_SYNC_DAYS, MAX_SYNC_DAYS
        )))
    }
}

/// Runs syncs and streak recomputation for users.
#[derive(Clone)]
pub struct SyncService {
    db: Arc<dyn ActivityStore>,
    source: Arc<dyn EventSource>,
    details: CommitDetailFetcher,
    aggregator: ActivityAggregator,
    streaks: StreakCalculator,
    settings: SyncSettings,
    locks: SyncLocks,
}

impl SyncService {
    pub fn new(
        db: Arc<dyn ActivityStore>,
        source: Arc<dyn EventSource>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            details: CommitDetailFetcher::new(source.clone()),
            aggregator: ActivityAggregator::new(db.clone()),
            streaks: StreakCalculator::new(db.clone()),
            db,
            source,
            settings,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Today's date under the configured day boundary.
    pub fn today(&self) -> NaiveDate {
        day_of(Utc::now(), self.settings.day_boundary)
    }

    fn user_lock(&self, user_id: u64) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop our handle and forget the user's lock if nobody else holds it.
    ///
    /// `remove_if` runs under the shard lock that `user_lock` also takes, so a
    /// concurrent caller either already holds a clone (count > 1) or gets a
    /// fresh mutex after removal.
    fn release_user_lock(&self, user_id: u64, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(&user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of users with a live lock entry.
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    // ─── Entry Points ────────────────────────────────────────────

    /// Sync the last `RECENT_SYNC_DAYS` days (manual and scheduled syncs).
    pub async fn sync_recent(&self, user_id: u64) -> Result<SyncSummary> {
        self.sync_range(user_id, RECENT_SYNC_DAYS).await
    }

    /// Sync the last `days` days, bounded by the configured timeout.
    ///
    /// On timeout the sync is abandoned between steps; whatever it already
    /// stored stays stored.
    pub async fn sync_range(&self, user_id: u64, days: u32) -> Result<SyncSummary> {
        validate_sync_days(days)?;

        tokio::time::timeout(self.settings.timeout, self.sync_range_at(user_id, days, Utc::now()))
            .await
            .map_err(|_| {
                tracing::warn!(user_id, days, "Sync timed out");
                AppError::SyncTimedOut(self.settings.timeout)
            })?
    }

    /// Sync the `days` days before `now`, without a timeout.
    pub async fn sync_range_at(
        &self,
        user_id: u64,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<SyncSummary> {
        validate_sync_days(days)?;

        let lock = self.user_lock(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.run_sync(user_id, days, now).await
        };
        self.release_user_lock(user_id, lock);
        result
    }

    async fn run_sync(&self, user_id: u64, days: u32, now: DateTime<Utc>) -> Result<SyncSummary> {
        tracing::info!(user_id, days, "Starting sync");

        // 1. Credential
        let tokens = self.db.get_tokens(user_id).await?.ok_or_else(|| {
            AppError::GitHubAuth(format!("No GitHub access token for user {}", user_id))
        })?;

        // 2. Upstream listing; the only step whose failure aborts the sync
        let since = window_start(now, days);
        let events = self
            .source
            .list_events(&tokens.access_token, since)
            .await
            .map_err(|e| {
                tracing::error!(user_id, error = %e, "Failed to list GitHub events");
                AppError::from(e)
            })?;

        // 3-4. Normalize and resolve line stats
        let pending = normalize_events(
            &events,
            since,
            self.settings.day_boundary,
            self.settings.commit_detail_limit,
        );
        let resolved = self.details.resolve(&tokens.access_token, pending).await;
        let fetched = resolved.deltas.len();

        // 5. Merge; buckets are unique per (repo, day) so each key is merged once
        let stamp = format_utc_rfc3339(now);
        let mut activities = Vec::with_capacity(fetched);
        let mut touched_days = BTreeSet::new();

        for day_delta in &resolved.deltas {
            touched_days.insert(day_delta.activity_date);

            match self
                .aggregator
                .merge_activity(
                    user_id,
                    &day_delta.repo_name,
                    day_delta.activity_date,
                    day_delta.delta,
                    &stamp,
                )
                .await
            {
                Ok(activity) => activities.push(activity),
                Err(e) => tracing::warn!(
                    user_id,
                    repo = %day_delta.repo_name,
                    activity_date = %day_delta.activity_date,
                    error = %e,
                    "Failed to merge activity, skipping"
                ),
            }
        }

        // 6. Daily totals, after every merge for the day is done
        for stat_date in touched_days {
            if let Err(e) = self
                .aggregator
                .recompute_daily_stat(user_id, stat_date, &stamp)
                .await
            {
                tracing::warn!(
                    user_id,
                    stat_date = %stat_date,
                    error = %e,
                    "Failed to recompute daily stat"
                );
            }
        }

        // 7. Streak
        let today = day_of(now, self.settings.day_boundary);
        let streak = match self.streaks.update_user_streak(user_id, today).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to update streak after sync");
                None
            }
        };

        if let Err(e) = self.mark_synced(user_id, &stamp).await {
            tracing::warn!(user_id, error = %e, "Failed to record sync time");
        }

        let summary = SyncSummary {
            fetched,
            saved: activities.len(),
            activities,
            detail_failures: resolved.failed_lookups,
            streak,
        };

        tracing::info!(
            user_id,
            days,
            events = events.len(),
            fetched = summary.fetched,
            saved = summary.saved,
            detail_failures = summary.detail_failures,
            "Sync complete"
        );

        Ok(summary)
    }

    async fn mark_synced(&self, user_id: u64, stamp: &str) -> Result<()> {
        if let Some(mut user) = self.db.get_user(user_id).await? {
            user.last_synced_at = Some(stamp.to_string());
            self.db.upsert_user(&user).await?;
        }
        Ok(())
    }

    // ─── Streaks ─────────────────────────────────────────────────

    /// Current streak as of today, without storing it.
    pub async fn compute_streak(&self, user_id: u64) -> Result<StreakSummary> {
        self.streaks.compute_streak(user_id, self.today()).await
    }

    /// Recompute and store the user's streak as of `today`.
    pub async fn update_user_streak(&self, user_id: u64, today: NaiveDate) -> Result<StreakSummary> {
        let lock = self.user_lock(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.streaks.update_user_streak(user_id, today).await
        };
        self.release_user_lock(user_id, lock);
        result
    }

    // ─── Profile ─────────────────────────────────────────────────

    /// Create or refresh the user's profile after a login.
    ///
    /// Runs under the user's lock so a concurrent sync's streak and
    /// `last_synced_at` writes are not overwritten with stale values.
    pub async fn upsert_profile(&self, profile: &GitHubUser, now: DateTime<Utc>) -> Result<User> {
        let lock = self.user_lock(profile.id);
        let result = {
            let _guard = lock.lock().await;
            self.write_profile(profile, now).await
        };
        self.release_user_lock(profile.id, lock);
        result
    }

    async fn write_profile(&self, profile: &GitHubUser, now: DateTime<Utc>) -> Result<User> {
        let user = match self.db.get_user(profile.id).await? {
            Some(mut existing) => {
                existing.username = profile.login.clone();
                existing.avatar_url = profile.avatar_url.clone();
                existing
            }
            None => User {
                github_id: profile.id,
                username: profile.login.clone(),
                avatar_url: profile.avatar_url.clone(),
                created_at: format_utc_rfc3339(now),
                current_streak: 0,
                longest_streak: 0,
                last_synced_at: None,
            },
        };
        self.db.upsert_user(&user).await?;
        Ok(user)
    }
}
