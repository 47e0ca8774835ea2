// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and streak fields)
//! - Tokens (GitHub credentials)
//! - Activities (per-user, per-repo, per-day rows)
//! - Daily stats (per-user, per-day totals)

use crate::db::{collections, ActivityStore};
use crate::error::AppError;
use crate::models::{Activity, ActivityFilter, DailyStat, DateRange, User, UserTokens};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Firestore stores days as "YYYY-MM-DD" strings, which sort chronologically.
fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl ActivityStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user.github_id.to_string())
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_user_ids(&self) -> Result<Vec<u64>, AppError> {
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().map(|u| u.github_id).collect())
    }

    // ─── Token Operations ────────────────────────────────────────

    async fn get_tokens(&self, user_id: u64) -> Result<Option<UserTokens>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TOKENS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_tokens(&self, user_id: u64, tokens: &UserTokens) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::TOKENS)
            .document_id(user_id.to_string())
            .object(tokens)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Activity Operations ─────────────────────────────────────

    async fn get_activity(
        &self,
        user_id: u64,
        repo_name: &str,
        activity_date: NaiveDate,
    ) -> Result<Option<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(&Activity::document_id(user_id, repo_name, activity_date))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_activity(&self, activity: &Activity) -> Result<(), AppError> {
        let doc_id = Activity::document_id(
            activity.user_id,
            &activity.repo_name,
            activity.activity_date,
        );

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&doc_id)
            .object(activity)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_activities_for_day(
        &self,
        user_id: u64,
        activity_date: NaiveDate,
    ) -> Result<Vec<Activity>, AppError> {
        let day = date_key(activity_date);

        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("activity_date").eq(day.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn query_activities(
        &self,
        user_id: u64,
        filter: &ActivityFilter,
    ) -> Result<Vec<Activity>, AppError> {
        let repo_name = filter.repo_name.clone();
        let from = filter.from.map(date_key);
        let to = filter.to.map(date_key);

        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    repo_name
                        .clone()
                        .and_then(|repo| q.field("repo_name").eq(repo)),
                    from.clone()
                        .and_then(|d| q.field("activity_date").greater_than_or_equal(d)),
                    to.clone()
                        .and_then(|d| q.field("activity_date").less_than_or_equal(d)),
                ])
            })
            .order_by([(
                "activity_date",
                firestore::FirestoreQueryDirection::Descending,
            )]);

        let query = match filter.limit {
            Some(limit) => query.limit(limit.min(u32::MAX as usize) as u32),
            None => query,
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Daily Stat Operations ───────────────────────────────────

    async fn set_daily_stat(&self, stat: &DailyStat) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::DAILY_STATS)
            .document_id(DailyStat::document_id(stat.user_id, stat.stat_date))
            .object(stat)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_daily_stats(
        &self,
        user_id: u64,
        range: Option<DateRange>,
    ) -> Result<Vec<DailyStat>, AppError> {
        let from = range.map(|r| date_key(r.from));
        let to = range.map(|r| date_key(r.to));

        self.get_client()?
            .fluent()
            .select()
            .from(collections::DAILY_STATS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    from.clone()
                        .and_then(|d| q.field("stat_date").greater_than_or_equal(d)),
                    to.clone()
                        .and_then(|d| q.field("stat_date").less_than_or_equal(d)),
                ])
            })
            .order_by([("stat_date", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_key_sorts_chronologically() {
        let earlier = date_key(NaiveDate::from_ymd_opt(2024, 9, 30).unwrap());
        let later = date_key(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
        assert_eq!(earlier, "2024-09-30");
        assert!(earlier < later);
    }

    #[tokio::test]
    async fn test_offline_client_reports_database_error() {
        let db = FirestoreDb::new_mock();

        let result = db.get_user(1).await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
