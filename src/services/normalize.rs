// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Turns raw push events into per-(repository, day) buckets.
//!
//! A bucket carries the full commit count of its pushes plus the SHAs whose
//! line stats will be looked up: the first `detail_limit` commits of every
//! push, in event order. Commits past the limit are counted but never
//! resolved, so additions/deletions undercount large pushes.

use crate::services::github::GitHubEvent;
use crate::time_utils::{day_of, parse_timestamp};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Activity observed for one repository on one day, before stats lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelta {
    pub repo_name: String,
    pub activity_date: NaiveDate,
    /// Sum of commit list lengths of every contributing push; never capped
    pub commit_count: u32,
    /// Commits selected for a detail lookup
    pub detail_shas: Vec<String>,
}

/// Group in-window push events by (repo, day).
///
/// Events without a repository name or with an unparseable timestamp are
/// dropped, as are events older than `since` (GitHub may return more than
/// asked for). Output is ordered by day, then repository.
pub fn normalize_events(
    events: &[GitHubEvent],
    since: DateTime<Utc>,
    day_boundary: FixedOffset,
    detail_limit: usize,
) -> Vec<PendingDelta> {
    let mut buckets: BTreeMap<(NaiveDate, String), PendingDelta> = BTreeMap::new();
    let mut dropped = 0usize;

    // Event order inside a bucket follows the upstream list.
    for event in events.iter().filter(|e| e.is_push()) {
        let repo_name = event.repo.name.trim();
        let Some(created_at) = parse_timestamp(&event.created_at) else {
            dropped += 1;
            continue;
        };
        if repo_name.is_empty() {
            dropped += 1;
            continue;
        }
        if created_at < since {
            continue;
        }

        let activity_date = day_of(created_at, day_boundary);
        let commits = &event.payload.commits;

        let bucket = buckets
            .entry((activity_date, repo_name.to_string()))
            .or_insert_with(|| PendingDelta {
                repo_name: repo_name.to_string(),
                activity_date,
                commit_count: 0,
                detail_shas: Vec::new(),
            });

        let pushed = u32::try_from(commits.len()).unwrap_or(u32::MAX);
        bucket.commit_count = bucket.commit_count.saturating_add(pushed);
        bucket.detail_shas.extend(
            commits
                .iter()
                .take(detail_limit)
                .map(|c| c.sha.clone()),
        );
    }

    if dropped > 0 {
        tracing::debug!(dropped, "Ignored malformed push events");
    }

    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::github::{CommitRef, EventPayload, EventRepo};
    use chrono::TimeZone;

    fn push(repo: &str, created_at: &str, shas: &[&str]) -> GitHubEvent {
        GitHubEvent {
            id: format!("{}-{}", repo, created_at),
            kind: "PushEvent".to_string(),
            repo: EventRepo {
                name: repo.to_string(),
            },
            created_at: created_at.to_string(),
            payload: EventPayload {
                commits: shas
                    .iter()
                    .map(|s| CommitRef { sha: s.to_string() })
                    .collect(),
            },
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_groups_by_repo_and_day() {
        let events = vec![
            push("a/one", "2024-01-02T18:00:00Z", &["1", "2"]),
            push("a/one", "2024-01-02T09:00:00Z", &["3"]),
            push("a/two", "2024-01-02T10:00:00Z", &["4"]),
            push("a/one", "2024-01-03T01:00:00Z", &["5"]),
        ];

        let deltas = normalize_events(&events, since(), utc(), 5);

        assert_eq!(deltas.len(), 3);
        assert_eq!(deltas[0].repo_name, "a/one");
        assert_eq!(deltas[0].activity_date, day(2));
        assert_eq!(deltas[0].commit_count, 3);
        assert_eq!(deltas[0].detail_shas, vec!["1", "2", "3"]);
        assert_eq!(deltas[1].repo_name, "a/two");
        assert_eq!(deltas[2].activity_date, day(3));
    }

    #[test]
    fn test_commit_count_uncapped_but_details_bounded() {
        let events = vec![push(
            "a/big",
            "2024-01-05T12:00:00Z",
            &["1", "2", "3", "4", "5", "6", "7"],
        )];

        let deltas = normalize_events(&events, since(), utc(), 5);

        assert_eq!(deltas[0].commit_count, 7);
        assert_eq!(deltas[0].detail_shas, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_detail_limit_applies_per_push() {
        let events = vec![
            push("a/r", "2024-01-05T12:00:00Z", &["1", "2", "3"]),
            push("a/r", "2024-01-05T13:00:00Z", &["4", "5", "6"]),
        ];

        let deltas = normalize_events(&events, since(), utc(), 2);

        assert_eq!(deltas[0].commit_count, 6);
        assert_eq!(deltas[0].detail_shas, vec!["1", "2", "4", "5"]);
    }

    #[test]
    fn test_drops_noise_and_out_of_window() {
        let mut watch = push("a/r", "2024-01-05T12:00:00Z", &["w"]);
        watch.kind = "WatchEvent".to_string();

        let events = vec![
            push("", "2024-01-05T12:00:00Z", &["1"]),
            push("a/r", "not a date", &["2"]),
            push("a/r", "2023-12-31T23:59:59Z", &["3"]),
            watch,
            push("a/r", "2024-01-01T00:00:00Z", &["4"]),
        ];

        let deltas = normalize_events(&events, since(), utc(), 5);

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].commit_count, 1);
        assert_eq!(deltas[0].detail_shas, vec!["4"]);
    }

    #[test]
    fn test_day_boundary_offset_moves_bucket() {
        let events = vec![push("a/r", "2024-01-05T22:00:00Z", &["1"])];
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();

        let deltas = normalize_events(&events, since(), plus_three, 5);

        assert_eq!(deltas[0].activity_date, day(6));
    }

    #[test]
    fn test_push_without_commits_yields_zero_count_bucket() {
        let events = vec![push("a/r", "2024-01-05T12:00:00Z", &[])];

        let deltas = normalize_events(&events, since(), utc(), 5);

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].commit_count, 0);
        assert!(deltas[0].detail_shas.is_empty());
    }
}
