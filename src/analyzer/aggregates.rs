//! Aggregate statistics computed over one corpus scan.
//!
//! Views are recomputed wholesale and replaced atomically; nothing here
//! is ever partially updated.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::types::{Category, Priority};

/// Per-category statistics plus the moment they were computed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateView {
    pub category: Category,
    pub computed_at: DateTime<Utc>,
    /// Total documents in the category, parseable or not.
    pub total: usize,
    pub stats: CategoryStats,
}

impl AggregateView {
    /// An empty view, used when a category scan fails outright so the
    /// snapshot still covers every category.
    pub fn empty(category: Category) -> Self {
        let stats = match category {
            Category::Meeting => CategoryStats::Meetings(MeetingStats::default()),
            Category::Task => CategoryStats::Tasks(TaskStats::default()),
            _ => CategoryStats::Entities(EntityStats::default()),
        };
        AggregateView {
            category,
            computed_at: Utc::now(),
            total: 0,
            stats,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryStats {
    Meetings(MeetingStats),
    Tasks(TaskStats),
    Entities(EntityStats),
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingStats {
    /// Meetings dated within the last 7 days.
    pub this_week: usize,
    /// Meetings dated within the last 30 days.
    pub this_month: usize,
    /// Ten most recent meetings, newest first.
    pub recent: Vec<RecentMeeting>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMeeting {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub days_ago: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub by_priority: PriorityCounts,
    /// Up to five urgent tasks: critical priority or due within three
    /// days, critical-first then nearest due date.
    pub urgent: Vec<UrgentTask>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::Critical => self.critical += 1,
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgentTask {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStats {
    /// Top five entities by meeting back-reference count.
    pub most_active: Vec<ActiveEntity>,
    /// Counts by the category's secondary grouping attribute
    /// (relationship for people/companies, category for technologies).
    pub by_group: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEntity {
    pub id: String,
    pub name: String,
    pub references: usize,
    pub group: Option<String>,
}

/// One full corpus snapshot: every category's view plus cross-category
/// derived metrics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSnapshot {
    pub computed_at: DateTime<Utc>,
    pub views: BTreeMap<Category, AggregateView>,
    pub growth: GrowthMetrics,
    pub meeting_trend: Trend,
}

impl VaultSnapshot {
    pub fn view(&self, category: Category) -> Option<&AggregateView> {
        self.views.get(&category)
    }
}

/// Vault growth indicators for the dashboard header.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthMetrics {
    pub total_documents: usize,
    pub meetings_this_week: usize,
    pub active_contacts: usize,
}

/// Coarse direction of recent meeting activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    /// Compare this week's count against a rough prior-week estimate
    /// derived from the rest of the month.
    pub fn from_meeting_counts(this_week: usize, this_month: usize) -> Trend {
        let last_week_estimate = (this_month.saturating_sub(this_week) / 3) as f64;
        let this_week = this_week as f64;
        if this_week > last_week_estimate * 1.2 {
            Trend::Increasing
        } else if this_week < last_week_estimate * 0.8 {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
}
