// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod daily_stat;
pub mod streak;
pub mod user;

pub use activity::{Activity, ActivityDelta, ActivityFilter};
pub use daily_stat::{DailyStat, DateRange};
pub use streak::StreakSummary;
pub use user::{User, UserTokens};
