// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Current/longest streak of consecutive active days.
//!
//! The scan is stateless: it only looks at the user's daily stats at call
//! time. A day is active when it has at least one commit. The current
//! streak is the run ending on the most recent active day, and only counts
//! while that day is today or yesterday.

use crate::db::ActivityStore;
use crate::error::{AppError, Result};
use crate::models::{DailyStat, StreakSummary};
use crate::time_utils::previous_day;
use chrono::NaiveDate;
use std::sync::Arc;

/// Scan `stats` (any order) for streaks as of `today`.
pub fn calculate_streak(stats: &[DailyStat], today: NaiveDate) -> StreakSummary {
    let mut active_days: Vec<NaiveDate> = stats
        .iter()
        .filter(|s| s.is_active())
        .map(|s| s.stat_date)
        .collect();
    active_days.sort_unstable();
    active_days.dedup();

    let Some(&last) = active_days.last() else {
        return StreakSummary::default();
    };

    let mut run = 1u32;
    let mut longest = 0u32;
    for pair in active_days.windows(2) {
        if (pair[1] - pair[0]).num_days() == 1 {
            run += 1;
        } else {
            longest = longest.max(run);
            run = 1;
        }
    }
    longest = longest.max(run);

    let is_active = last == today || last == previous_day(today);

    StreakSummary {
        current_streak: if is_active { run } else { 0 },
        longest_streak: longest,
        last_activity_date: Some(last),
        is_active,
    }
}

/// Reads daily stats and keeps the user's streak fields up to date.
#[derive(Clone)]
pub struct StreakCalculator {
    db: Arc<dyn ActivityStore>,
}

impl StreakCalculator {
    pub fn new(db: Arc<dyn ActivityStore>) -> Self {
        Self { db }
    }

    /// Compute the streak from the user's whole daily-stat history.
    pub async fn compute_streak(&self, user_id: u64, today: NaiveDate) -> Result<StreakSummary> {
        let stats = self.db.get_daily_stats(user_id, None).await?;
        Ok(calculate_streak(&stats, today))
    }

    /// Compute the streak and store it on the user.
    ///
    /// The stored longest streak never goes down, even if the history that
    /// produced it has since changed.
    pub async fn update_user_streak(&self, user_id: u64, today: NaiveDate) -> Result<StreakSummary> {
        let summary = self.compute_streak(user_id, today).await?;

        let mut user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        user.apply_streak(summary.current_streak, summary.longest_streak);
        self.db.upsert_user(&user).await?;

        tracing::info!(
            user_id,
            current_streak = user.current_streak,
            longest_streak = user.longest_streak,
            is_active = summary.is_active,
            "Streak updated"
        );

        Ok(summary)
    }
}
