//! Corpus scanning and aggregate computation.
//!
//! One synchronous scan algorithm per category, accelerated by the
//! metadata cache. `analyze_all` fans independent category scans out over
//! a bounded blocking-task pool; the scan logic itself is not duplicated
//! for the concurrent path.
//!
//! A single malformed or unreadable document never aborts its category:
//! it is logged, skipped, and excluded from the aggregates.

pub mod aggregates;

pub use aggregates::{
    ActiveEntity, AggregateView, CategoryStats, EntityStats, GrowthMetrics, MeetingStats,
    PriorityCounts, RecentMeeting, TaskStats, Trend, UrgentTask, VaultSnapshot,
};

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Local, NaiveDate, Utc};
use tokio::sync::Semaphore;

use crate::cache::MetadataCache;
use crate::config::AnalyzerConfig;
use crate::error::VaultError;
use crate::metadata::{self, DocMetadata};
use crate::store::VaultStore;
use crate::types::{Category, Priority};

const RECENT_MEETING_CAP: usize = 10;
const URGENT_TASK_CAP: usize = 5;
const TOP_ENTITY_CAP: usize = 5;
const URGENT_DUE_DAYS: i64 = 3;

/// Scans document categories and produces aggregate views.
#[derive(Clone)]
pub struct CorpusAnalyzer {
    store: Arc<VaultStore>,
    cache: Arc<MetadataCache>,
    worker_width: usize,
}

impl CorpusAnalyzer {
    pub fn new(store: Arc<VaultStore>, cache: Arc<MetadataCache>, config: &AnalyzerConfig) -> Self {
        CorpusAnalyzer {
            store,
            cache,
            worker_width: config.worker_width.max(1),
        }
    }

    /// Scan one category. Synchronous; this is the single implementation
    /// both direct calls and the concurrent fan-out use.
    pub fn analyze(&self, category: Category) -> Result<AggregateView, VaultError> {
        let today = Local::now().date_naive();
        let ids = self.store.list(category)?;

        let mut total = 0usize;
        let mut documents: Vec<(String, DocMetadata)> = Vec::new();
        for id in ids {
            total += 1;
            if let Some(meta) = self.metadata_for(category, &id) {
                documents.push((id, meta));
            }
        }

        let stats = match category {
            Category::Meeting => CategoryStats::Meetings(meeting_stats(&documents, today)),
            Category::Task => CategoryStats::Tasks(task_stats(&documents, today)),
            _ => CategoryStats::Entities(entity_stats(category, &documents)),
        };

        Ok(AggregateView {
            category,
            computed_at: Utc::now(),
            total,
            stats,
        })
    }

    /// Scan several categories concurrently (bounded pool) and assemble a
    /// snapshot. A category whose scan fails contributes an empty view
    /// and a logged warning; the snapshot itself always materializes.
    pub async fn analyze_all(&self, categories: &[Category]) -> VaultSnapshot {
        let semaphore = Arc::new(Semaphore::new(self.worker_width));
        let mut handles = Vec::with_capacity(categories.len());

        for &category in categories {
            let analyzer = self.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (category, None),
                };
                match tokio::task::spawn_blocking(move || analyzer.analyze(category)).await {
                    Ok(Ok(view)) => (category, Some(view)),
                    Ok(Err(e)) => {
                        log::warn!("analysis of {} failed: {}", category, e);
                        (category, None)
                    }
                    Err(e) => {
                        log::warn!("analysis task for {} panicked: {}", category, e);
                        (category, None)
                    }
                }
            }));
        }

        let mut views: BTreeMap<Category, AggregateView> = BTreeMap::new();
        for handle in handles {
            match handle.await {
                Ok((category, Some(view))) => {
                    views.insert(category, view);
                }
                Ok((category, None)) => {
                    views.insert(category, AggregateView::empty(category));
                }
                Err(e) => log::warn!("analysis join failed: {}", e),
            }
        }

        let growth = growth_metrics(&views);
        let meeting_trend = views
            .get(&Category::Meeting)
            .and_then(|v| match &v.stats {
                CategoryStats::Meetings(m) => Some(Trend::from_meeting_counts(
                    m.this_week,
                    m.this_month,
                )),
                _ => None,
            })
            .unwrap_or(Trend::Stable);

        VaultSnapshot {
            computed_at: Utc::now(),
            views,
            growth,
            meeting_trend,
        }
    }

    /// Cached metadata for one document, deriving and caching on miss.
    /// Unreadable documents are skipped with a diagnostic.
    fn metadata_for(&self, category: Category, id: &str) -> Option<DocMetadata> {
        if let Some(meta) = self.cache.get(&self.store, category, id) {
            return Some(meta);
        }
        match self.store.read(category, id) {
            Ok(content) => {
                let meta = metadata::derive(category, id, &content);
                self.cache.put(&self.store, category, id, meta.clone());
                Some(meta)
            }
            Err(e) => {
                log::warn!("skipping {}/{}: {}", category, id, e);
                None
            }
        }
    }
}

fn meeting_stats(documents: &[(String, DocMetadata)], today: NaiveDate) -> MeetingStats {
    let mut recent: Vec<RecentMeeting> = Vec::new();
    let mut this_week = 0usize;
    let mut this_month = 0usize;

    for (id, meta) in documents {
        let Some(date) = meta.date else { continue };
        let days_ago = (today - date).num_days();
        if days_ago > 30 {
            continue;
        }
        if days_ago <= 7 {
            this_week += 1;
        }
        this_month += 1;
        recent.push(RecentMeeting {
            id: id.clone(),
            title: meta.title.clone(),
            date,
            days_ago,
        });
    }

    recent.sort_by_key(|m| m.days_ago);
    recent.truncate(RECENT_MEETING_CAP);

    MeetingStats {
        this_week,
        this_month,
        recent,
    }
}

fn task_stats(documents: &[(String, DocMetadata)], today: NaiveDate) -> TaskStats {
    let mut by_priority = PriorityCounts::default();
    let mut urgent: Vec<UrgentTask> = Vec::new();
    let due_cutoff = today + ChronoDuration::days(URGENT_DUE_DAYS);

    for (id, meta) in documents {
        let priority = meta.priority.unwrap_or(Priority::Medium);
        by_priority.bump(priority);

        let due_soon = meta.due_date.is_some_and(|due| due <= due_cutoff);
        if priority == Priority::Critical || due_soon {
            urgent.push(UrgentTask {
                id: id.clone(),
                title: meta.title.clone(),
                priority,
                due: meta.due_date,
            });
        }
    }

    // Critical first, then nearest due date, unspecified dates last
    urgent.sort_by(|a, b| {
        let a_critical = a.priority == Priority::Critical;
        let b_critical = b.priority == Priority::Critical;
        b_critical
            .cmp(&a_critical)
            .then_with(|| match (a.due, b.due) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
    urgent.truncate(URGENT_TASK_CAP);

    TaskStats {
        by_priority,
        urgent,
    }
}

fn entity_stats(category: Category, documents: &[(String, DocMetadata)]) -> EntityStats {
    let mut by_group: BTreeMap<String, usize> = BTreeMap::new();
    let mut active: Vec<ActiveEntity> = Vec::new();

    for (id, meta) in documents {
        let group = group_key(category, meta);
        if let Some(group) = &group {
            *by_group.entry(group.clone()).or_insert(0) += 1;
        }
        if meta.reference_count > 0 {
            active.push(ActiveEntity {
                id: id.clone(),
                name: meta.title.clone(),
                references: meta.reference_count,
                group,
            });
        }
    }

    active.sort_by(|a, b| b.references.cmp(&a.references).then_with(|| a.id.cmp(&b.id)));
    active.truncate(TOP_ENTITY_CAP);

    EntityStats {
        most_active: active,
        by_group,
    }
}

/// Secondary grouping attribute per entity category.
fn group_key(category: Category, meta: &DocMetadata) -> Option<String> {
    match category {
        Category::Person | Category::Company => Some(
            meta.relationship
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        ),
        Category::Technology => Some(
            meta.tech_category
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "general".to_string()),
        ),
        _ => None,
    }
}

fn growth_metrics(views: &BTreeMap<Category, AggregateView>) -> GrowthMetrics {
    let total_documents = views.values().map(|v| v.total).sum();
    let meetings_this_week = views
        .get(&Category::Meeting)
        .and_then(|v| match &v.stats {
            CategoryStats::Meetings(m) => Some(m.this_week),
            _ => None,
        })
        .unwrap_or(0);
    let active_contacts = views
        .get(&Category::Person)
        .and_then(|v| match &v.stats {
            CategoryStats::Entities(e) => Some(e.most_active.len()),
            _ => None,
        })
        .unwrap_or(0);

    GrowthMetrics {
        total_documents,
        meetings_this_week,
        active_contacts,
    }
}
