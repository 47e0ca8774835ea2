// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Streak summary returned by the streak calculator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Result of scanning a user's daily totals for consecutive active days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakSummary {
    /// Run of consecutive active days ending today or yesterday; 0 otherwise
    pub current_streak: u32,
    /// Longest run of consecutive active days in the history
    pub longest_streak: u32,
    /// Most recent active day
    pub last_activity_date: Option<NaiveDate>,
    /// Whether the most recent active day is today or yesterday
    pub is_active: bool,
}
