// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-repository, per-day commit activity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Commit and line-change counts observed for one (repo, day) bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDelta {
    pub commit_count: u32,
    /// Best effort: only the looked-up commits contribute
    pub additions: u64,
    pub deletions: u64,
}

impl Add for ActivityDelta {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            commit_count: self.commit_count.saturating_add(rhs.commit_count),
            additions: self.additions.saturating_add(rhs.additions),
            deletions: self.deletions.saturating_add(rhs.deletions),
        }
    }
}

impl AddAssign for ActivityDelta {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Stored activity row, unique per (user_id, repo_name, activity_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Activity {
    /// GitHub account ID (owner)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    /// Full repository name ("owner/repo")
    pub repo_name: String,
    /// Day bucket ("YYYY-MM-DD")
    pub activity_date: NaiveDate,
    pub commit_count: u32,
    pub additions: u64,
    pub deletions: u64,
    /// Last write timestamp (RFC3339)
    pub updated_at: String,
}

impl Activity {
    /// Build a fresh row holding exactly `delta`.
    pub fn new(
        user_id: u64,
        repo_name: &str,
        activity_date: NaiveDate,
        delta: ActivityDelta,
        now: &str,
    ) -> Self {
        Self {
            user_id,
            repo_name: repo_name.to_string(),
            activity_date,
            commit_count: delta.commit_count,
            additions: delta.additions,
            deletions: delta.deletions,
            updated_at: now.to_string(),
        }
    }

    /// Document ID encoding the unique key.
    pub fn document_id(user_id: u64, repo_name: &str, activity_date: NaiveDate) -> String {
        format!(
            "{}_{}_{}",
            user_id,
            activity_date.format("%Y-%m-%d"),
            urlencoding::encode(repo_name)
        )
    }

    /// The counts carried by this row.
    pub fn counts(&self) -> ActivityDelta {
        ActivityDelta {
            commit_count: self.commit_count,
            additions: self.additions,
            deletions: self.deletions,
        }
    }

    /// Add `delta` to the stored counts, elementwise.
    pub fn accumulate(&mut self, delta: ActivityDelta, now: &str) {
        let total = self.counts() + delta;
        self.commit_count = total.commit_count;
        self.additions = total.additions;
        self.deletions = total.deletions;
        self.updated_at = now.to_string();
    }
}

/// Optional filters for reading a user's activity rows.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub repo_name: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl ActivityFilter {
    /// Whether `activity` passes the repo and date filters (limit not applied).
    pub fn matches(&self, activity: &Activity) -> bool {
        self.repo_name
            .as_deref()
            .is_none_or(|repo| activity.repo_name == repo)
            && self.from.is_none_or(|from| activity.activity_date >= from)
            && self.to.is_none_or(|to| activity.activity_date <= to)
    }
}
