// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resolves the selected commits of each bucket to line stats.
//!
//! Every lookup failure (not found, rate limited, network) counts as zero
//! additions/deletions and is only logged; it never fails the sync.

use crate::models::ActivityDelta;
use crate::services::github::EventSource;
use crate::services::normalize::PendingDelta;
use chrono::NaiveDate;
use futures_util::{stream, StreamExt};
use std::sync::Arc;

/// Detail lookups in flight at once within one sync.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// A bucket with its final counts, ready to merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayDelta {
    pub repo_name: String,
    pub activity_date: NaiveDate,
    pub delta: ActivityDelta,
}

/// Output of resolving a batch of buckets.
#[derive(Debug, Default)]
pub struct ResolvedDeltas {
    pub deltas: Vec<DayDelta>,
    /// Lookups that failed and contributed nothing
    pub failed_lookups: u32,
}

/// Per-commit stats resolver.
#[derive(Clone)]
pub struct CommitDetailFetcher {
    source: Arc<dyn EventSource>,
}

impl CommitDetailFetcher {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self { source }
    }

    /// Resolve all buckets, preserving their order.
    pub async fn resolve(&self, access_token: &str, pending: Vec<PendingDelta>) -> ResolvedDeltas {
        let mut resolved = ResolvedDeltas::default();

        for bucket in pending {
            let (additions, deletions, failed) = self
                .sum_stats(access_token, &bucket.repo_name, &bucket.detail_shas)
                .await;
            resolved.failed_lookups += failed;

            resolved.deltas.push(DayDelta {
                repo_name: bucket.repo_name,
                activity_date: bucket.activity_date,
                delta: ActivityDelta {
                    commit_count: bucket.commit_count,
                    additions,
                    deletions,
                },
            });
        }

        resolved
    }

    /// Total (additions, deletions, failed lookups) over `shas`.
    async fn sum_stats(&self, access_token: &str, repo_name: &str, shas: &[String]) -> (u64, u64, u32) {
        // Each lookup owns its inputs; borrowed stream items make the future
        // fail axum's handler bounds.
        let results: Vec<_> = stream::iter(shas.iter().cloned())
            .map(|sha| {
                let source = Arc::clone(&self.source);
                let access_token = access_token.to_string();
                let repo_name = repo_name.to_string();
                async move {
                    let result = source
                        .get_commit_stats(&access_token, &repo_name, &sha)
                        .await;
                    (sha, result)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
            .collect()
            .await;

        let mut additions = 0u64;
        let mut deletions = 0u64;
        let mut failed = 0u32;

        for (sha, result) in results {
            match result {
                Ok(stats) => {
                    additions = additions.saturating_add(stats.additions);
                    deletions = deletions.saturating_add(stats.deletions);
                }
                Err(e) => {
                    tracing::warn!(
                        repo = %repo_name,
                        sha = %sha,
                        error = %e,
                        "Commit detail lookup failed, counting zero lines"
                    );
                    failed += 1;
                }
            }
        }

        (additions, deletions, failed)
    }
}
