//! Database layer.
//!
//! Everything above this module talks to storage through [`ActivityStore`],
//! so the same sync pipeline runs against Firestore in production and
//! against [`MemoryDb`] locally and in tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Activity, ActivityFilter, DailyStat, DateRange, User, UserTokens};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TOKENS: &str = "tokens";
    /// Keyed by `{user_id}_{date}_{repo}`
    pub const ACTIVITIES: &str = "activities";
    /// Keyed by `{user_id}_{date}`
    pub const DAILY_STATS: &str = "daily_stats";
}

/// Persistence contract for users, credentials, activity rows and daily totals.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError>;

    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    /// IDs of every stored user (scheduled sync fan-out).
    async fn list_user_ids(&self) -> Result<Vec<u64>, AppError>;

    // ─── Credentials ─────────────────────────────────────────────

    async fn get_tokens(&self, user_id: u64) -> Result<Option<UserTokens>, AppError>;

    async fn set_tokens(&self, user_id: u64, tokens: &UserTokens) -> Result<(), AppError>;

    // ─── Activities ──────────────────────────────────────────────

    async fn get_activity(
        &self,
        user_id: u64,
        repo_name: &str,
        activity_date: NaiveDate,
    ) -> Result<Option<Activity>, AppError>;

    /// Create or replace the row for the activity's unique key.
    async fn set_activity(&self, activity: &Activity) -> Result<(), AppError>;

    /// All rows for one user and day, across repositories.
    async fn get_activities_for_day(
        &self,
        user_id: u64,
        activity_date: NaiveDate,
    ) -> Result<Vec<Activity>, AppError>;

    /// A user's rows, newest day first.
    async fn query_activities(
        &self,
        user_id: u64,
        filter: &ActivityFilter,
    ) -> Result<Vec<Activity>, AppError>;

    // ─── Daily Stats ─────────────────────────────────────────────

    /// Create or fully replace the row for the stat's unique key.
    async fn set_daily_stat(&self, stat: &DailyStat) -> Result<(), AppError>;

    /// A user's daily stats, oldest first. `None` reads the whole history.
    async fn get_daily_stats(
        &self,
        user_id: u64,
        range: Option<DateRange>,
    ) -> Result<Vec<DailyStat>, AppError>;
}
