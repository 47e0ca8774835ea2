//! Per-user daily totals across all repositories.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{Activity, ActivityDelta};

/// Daily totals for one user, unique per (user_id, stat_date).
///
/// Always derived from the user's Activity rows for the day; never
/// accumulated directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailyStat {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub stat_date: NaiveDate,
    pub total_commits: u32,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub updated_at: String,
}

impl DailyStat {
    /// Sum `activities` (all rows for the user and day) into a fresh stat.
    pub fn from_activities(
        user_id: u64,
        stat_date: NaiveDate,
        activities: &[Activity],
        now: &str,
    ) -> Self {
        let totals = activities
            .iter()
            .map(Activity::counts)
            .fold(ActivityDelta::default(), |acc, counts| acc + counts);

        Self {
            user_id,
            stat_date,
            total_commits: totals.commit_count,
            total_additions: totals.additions,
            total_deletions: totals.deletions,
            updated_at: now.to_string(),
        }
    }

    /// Document ID encoding the unique key.
    pub fn document_id(user_id: u64, stat_date: NaiveDate) -> String {
        format!("{}_{}", user_id, stat_date.format("%Y-%m-%d"))
    }

    /// A day counts toward streaks only if at least one commit landed.
    pub fn is_active(&self) -> bool {
        self.total_commits > 0
    }
}

/// Inclusive date range for daily stat reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_activities_sums_repositories() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let rows = vec![
            Activity::new(
                7,
                "a/one",
                date,
                ActivityDelta {
                    commit_count: 2,
                    additions: 10,
                    deletions: 1,
                },
                "t",
            ),
            Activity::new(
                7,
                "a/two",
                date,
                ActivityDelta {
                    commit_count: 5,
                    additions: 0,
                    deletions: 4,
                },
                "t",
            ),
        ];

        let stat = DailyStat::from_activities(7, date, &rows, "now");

        assert_eq!(stat.total_commits, 7);
        assert_eq!(stat.total_additions, 10);
        assert_eq!(stat.total_deletions, 5);
        assert!(stat.is_active());
    }

    #[test]
    fn test_from_no_activities_is_zero() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let stat = DailyStat::from_activities(7, date, &[], "now");

        assert_eq!(stat.total_commits, 0);
        assert!(!stat.is_active());
        assert_eq!(DailyStat::document_id(7, date), "7_2024-02-01");
    }
}
