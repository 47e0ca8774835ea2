// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and day bucketing.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an upstream ISO 8601 timestamp. Returns `None` for anything malformed.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Calendar day a timestamp falls on, with day boundaries at midnight in `offset`.
pub fn day_of(timestamp: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&offset).date_naive()
}

/// Start of the lookback window: `now - days`.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now - chrono::Duration::days(i64::from(days))
}

/// The day before `date`, saturating at the minimum representable date.
pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}
