// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity merging and daily aggregation.
//!
//! `merge_activity` is a read-modify-write: the existing row for the
//! (user, repo, day) key is read, the delta added, and the sum written back.
//! It is not atomic, so callers must serialize merges for the same user
//! (the sync service holds a per-user lock for this). Merging the same delta
//! twice counts it twice.
//!
//! `recompute_daily_stat` derives the day's totals from the stored activity
//! rows and fully replaces the daily stat, so it is idempotent.

use crate::db::ActivityStore;
use crate::error::Result;
use crate::models::{Activity, ActivityDelta, DailyStat};
use chrono::NaiveDate;
use std::sync::Arc;

/// Owns all writes to activity rows and daily stats.
#[derive(Clone)]
pub struct ActivityAggregator {
    db: Arc<dyn ActivityStore>,
}

impl ActivityAggregator {
    pub fn new(db: Arc<dyn ActivityStore>) -> Self {
        Self { db }
    }

    /// Add `delta` to the row for (user, repo, day), creating it if absent.
    pub async fn merge_activity(
        &self,
        user_id: u64,
        repo_name: &str,
        activity_date: NaiveDate,
        delta: ActivityDelta,
        now: &str,
    ) -> Result<Activity> {
        let merged = match self
            .db
            .get_activity(user_id, repo_name, activity_date)
            .await?
        {
            Some(mut existing) => {
                existing.accumulate(delta, now);
                existing
            }
            None => Activity::new(user_id, repo_name, activity_date, delta, now),
        };

        self.db.set_activity(&merged).await?;

        tracing::debug!(
            user_id,
            repo = %repo_name,
            activity_date = %activity_date,
            commits = merged.commit_count,
            "Activity merged"
        );

        Ok(merged)
    }

    /// Re-derive the user's totals for `stat_date` from all activity rows.
    ///
    /// A day without rows gets a zero-total stat rather than no stat.
    pub async fn recompute_daily_stat(
        &self,
        user_id: u64,
        stat_date: NaiveDate,
        now: &str,
    ) -> Result<DailyStat> {
        let activities = self.db.get_activities_for_day(user_id, stat_date).await?;
        let stat = DailyStat::from_activities(user_id, stat_date, &activities, now);

        self.db.set_daily_stat(&stat).await?;

        tracing::debug!(
            user_id,
            stat_date = %stat_date,
            repos = activities.len(),
            total_commits = stat.total_commits,
            "Daily stat recomputed"
        );

        Ok(stat)
    }
}
