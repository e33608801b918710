//! Dashboard refresh policy.
//!
//! A pure decision function over literal inputs: the age of the last
//! snapshot, what the just-processed document created, its name, and the
//! clock. Rules are evaluated in order; the first match wins.

use std::time::Duration;

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::NewNodeCounts;

/// Tunable thresholds and keyword signals.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshThresholds {
    /// Critical tasks in one document that force a refresh.
    pub critical_tasks: usize,
    /// High-priority tasks in one document that force a refresh.
    pub high_priority_tasks: usize,
    /// Newly created companies that force a refresh.
    pub new_companies: usize,
    /// Newly created people that force a refresh.
    pub new_people: usize,
    /// Total tasks in one document that force a refresh.
    pub total_tasks: usize,
    /// Snapshot age (hours) past which it counts as stale.
    pub hours_between_updates: u64,
    /// Local hour for the morning refresh.
    pub morning_refresh_hour: u32,
    /// Minimum snapshot age (hours) for the morning refresh.
    pub morning_backlog_hours: u64,
    /// Minimum snapshot age (hours) for the Monday weekly refresh.
    pub weekly_backlog_hours: u64,
    /// Document-name keywords (case-insensitive substring match) that
    /// force a refresh.
    pub keywords: Vec<String>,
}

impl Default for RefreshThresholds {
    fn default() -> Self {
        RefreshThresholds {
            critical_tasks: 1,
            high_priority_tasks: 2,
            new_companies: 2,
            new_people: 3,
            total_tasks: 5,
            hours_between_updates: 6,
            morning_refresh_hour: 9,
            morning_backlog_hours: 12,
            weekly_backlog_hours: 48,
            keywords: [
                "client", "sales", "contract", "deal", "strategy", "executive", "board",
                "crisis", "urgent", "critical", "launch", "review", "kickoff", "milestone",
                "deadline", "emergency",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Why a refresh was or wasn't triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshReason {
    HighImpact,
    Stale,
    Morning,
    Weekly,
    Keyword,
    UpToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshDecision {
    pub refresh: bool,
    pub reason: RefreshReason,
}

impl RefreshDecision {
    fn yes(reason: RefreshReason) -> Self {
        RefreshDecision {
            refresh: true,
            reason,
        }
    }
}

/// Decide whether the just-processed document warrants recomputing the
/// dashboard snapshot. Side-effect free.
pub fn should_refresh(
    thresholds: &RefreshThresholds,
    last_view_age: Duration,
    newly_created: &NewNodeCounts,
    triggering_doc_name: &str,
    now: DateTime<Local>,
) -> RefreshDecision {
    if is_high_impact(thresholds, newly_created) {
        return RefreshDecision::yes(RefreshReason::HighImpact);
    }

    let hours = |h: u64| Duration::from_secs(h * 3600);

    if last_view_age >= hours(thresholds.hours_between_updates) {
        return RefreshDecision::yes(RefreshReason::Stale);
    }

    if now.hour() == thresholds.morning_refresh_hour
        && last_view_age >= hours(thresholds.morning_backlog_hours)
    {
        return RefreshDecision::yes(RefreshReason::Morning);
    }

    if now.weekday() == Weekday::Mon
        && now.hour() == thresholds.morning_refresh_hour
        && last_view_age >= hours(thresholds.weekly_backlog_hours)
    {
        return RefreshDecision::yes(RefreshReason::Weekly);
    }

    let name = triggering_doc_name.to_lowercase();
    if thresholds.keywords.iter().any(|k| name.contains(k.as_str())) {
        return RefreshDecision::yes(RefreshReason::Keyword);
    }

    RefreshDecision {
        refresh: false,
        reason: RefreshReason::UpToDate,
    }
}

fn is_high_impact(thresholds: &RefreshThresholds, counts: &NewNodeCounts) -> bool {
    counts.critical_tasks >= thresholds.critical_tasks
        || counts.high_priority_tasks >= thresholds.high_priority_tasks
        || counts.companies >= thresholds.new_companies
        || counts.people >= thresholds.new_people
        || counts.total_tasks >= thresholds.total_tasks
}
