// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for local development (`STORE_BACKEND=memory`) and tests.
//!
//! Documents are keyed exactly like their Firestore counterparts, so the
//! uniqueness rules are the same. Nothing survives a restart.

use crate::db::ActivityStore;
use crate::error::AppError;
use crate::models::{Activity, ActivityFilter, DailyStat, DateRange, User, UserTokens};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::time::Duration;

/// Dashmap-backed implementation of [`ActivityStore`].
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<u64, User>>,
    tokens: Arc<DashMap<u64, UserTokens>>,
    activities: Arc<DashMap<String, Activity>>,
    daily_stats: Arc<DashMap<String, DailyStat>>,
    /// Activity writes for these repositories fail with a database error.
    failing_repos: Arc<DashSet<String>>,
    /// Artificial latency before every operation (exposes interleavings).
    latency: Option<Duration>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` before every operation, like a remote store would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every activity write for `repo_name` fail until cleared.
    pub fn fail_activity_writes_for(&self, repo_name: &str) {
        self.failing_repos.insert(repo_name.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_repos.clear();
    }

    async fn round_trip(&self) {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }
}

#[async_trait]
impl ActivityStore for MemoryDb {
    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        self.round_trip().await;
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.round_trip().await;
        self.users.insert(user.github_id, user.clone());
        Ok(())
    }

    async fn list_user_ids(&self) -> Result<Vec<u64>, AppError> {
        self.round_trip().await;
        let mut ids: Vec<u64> = self.users.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn get_tokens(&self, user_id: u64) -> Result<Option<UserTokens>, AppError> {
        self.round_trip().await;
        Ok(self.tokens.get(&user_id).map(|t| t.clone()))
    }

    async fn set_tokens(&self, user_id: u64, tokens: &UserTokens) -> Result<(), AppError> {
        self.round_trip().await;
        self.tokens.insert(user_id, tokens.clone());
        Ok(())
    }

    async fn get_activity(
        &self,
        user_id: u64,
        repo_name: &str,
        activity_date: NaiveDate,
    ) -> Result<Option<Activity>, AppError> {
        self.round_trip().await;
        let doc_id = Activity::document_id(user_id, repo_name, activity_date);
        Ok(self.activities.get(&doc_id).map(|a| a.clone()))
    }

    async fn set_activity(&self, activity: &Activity) -> Result<(), AppError> {
        self.round_trip().await;
        if self.failing_repos.contains(&activity.repo_name) {
            return Err(AppError::Database(format!(
                "Injected write failure for {}",
                activity.repo_name
            )));
        }

        let doc_id = Activity::document_id(
            activity.user_id,
            &activity.repo_name,
            activity.activity_date,
        );
        self.activities.insert(doc_id, activity.clone());
        Ok(())
    }

    async fn get_activities_for_day(
        &self,
        user_id: u64,
        activity_date: NaiveDate,
    ) -> Result<Vec<Activity>, AppError> {
        self.round_trip().await;
        Ok(self
            .activities
            .iter()
            .filter(|a| a.user_id == user_id && a.activity_date == activity_date)
            .map(|a| a.clone())
            .collect())
    }

    async fn query_activities(
        &self,
        user_id: u64,
        filter: &ActivityFilter,
    ) -> Result<Vec<Activity>, AppError> {
        self.round_trip().await;
        let mut rows: Vec<Activity> = self
            .activities
            .iter()
            .filter(|a| a.user_id == user_id && filter.matches(a))
            .map(|a| a.clone())
            .collect();

        rows.sort_by(|a, b| {
            b.activity_date
                .cmp(&a.activity_date)
                .then_with(|| a.repo_name.cmp(&b.repo_name))
        });
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn set_daily_stat(&self, stat: &DailyStat) -> Result<(), AppError> {
        self.round_trip().await;
        self.daily_stats.insert(
            DailyStat::document_id(stat.user_id, stat.stat_date),
            stat.clone(),
        );
        Ok(())
    }

    async fn get_daily_stats(
        &self,
        user_id: u64,
        range: Option<DateRange>,
    ) -> Result<Vec<DailyStat>, AppError> {
        self.round_trip().await;
        let mut rows: Vec<DailyStat> = self
            .daily_stats
            .iter()
            .filter(|s| s.user_id == user_id && range.is_none_or(|r| r.contains(s.stat_date)))
            .map(|s| s.clone())
            .collect();

        rows.sort_by_key(|s| s.stat_date);
        Ok(rows)
    }
}
