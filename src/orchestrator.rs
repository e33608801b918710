//! Top-level dashboard coordination.
//!
//! After each processed document the orchestrator applies the refresh
//! policy against the published snapshot's age. When a refresh fires, a
//! full corpus scan runs and the snapshot is replaced atomically — a
//! partial or abandoned scan publishes nothing. Rendering is delegated to
//! a [`DashboardSink`]; sink failures are logged and never fatal.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;

use crate::analyzer::{CorpusAnalyzer, VaultSnapshot};
use crate::refresh::{should_refresh, RefreshDecision, RefreshThresholds};
use crate::types::{Category, NewNodeCounts};

/// Snapshot age assumed when no snapshot has ever been published;
/// guarantees the first evaluation refreshes.
const NEVER_REFRESHED: Duration = Duration::from_secs(365 * 24 * 3600);

/// Consumes published snapshots for rendering (out of the engine's
/// scope: markdown, UI events, anything).
pub trait DashboardSink: Send + Sync {
    fn publish(&self, snapshot: &VaultSnapshot) -> Result<(), String>;
}

struct Published {
    snapshot: Arc<VaultSnapshot>,
    at: DateTime<Utc>,
}

/// Coordinates analysis runs and snapshot publication.
pub struct DashboardOrchestrator {
    analyzer: CorpusAnalyzer,
    thresholds: RefreshThresholds,
    sink: Option<Arc<dyn DashboardSink>>,
    current: Mutex<Option<Published>>,
}

impl DashboardOrchestrator {
    pub fn new(analyzer: CorpusAnalyzer, thresholds: RefreshThresholds) -> Self {
        DashboardOrchestrator {
            analyzer,
            thresholds,
            sink: None,
            current: Mutex::new(None),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DashboardSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The last published snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<VaultSnapshot>> {
        self.current.lock().as_ref().map(|p| p.snapshot.clone())
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.current.lock().as_ref().map(|p| p.at)
    }

    fn snapshot_age(&self) -> Duration {
        match self.last_refreshed() {
            Some(at) => (Utc::now() - at).to_std().unwrap_or(Duration::ZERO),
            None => NEVER_REFRESHED,
        }
    }

    /// Apply the refresh policy to a just-processed document without
    /// running anything.
    pub fn evaluate(&self, doc_name: &str, counts: &NewNodeCounts) -> RefreshDecision {
        should_refresh(
            &self.thresholds,
            self.snapshot_age(),
            counts,
            doc_name,
            Local::now(),
        )
    }

    /// Record that a source document was processed; refresh the snapshot
    /// if the policy calls for it. Returns the decision either way.
    pub async fn note_processed(&self, doc_name: &str, counts: &NewNodeCounts) -> RefreshDecision {
        let decision = self.evaluate(doc_name, counts);
        if decision.refresh {
            log::info!(
                "refreshing dashboard after '{}' ({:?})",
                doc_name,
                decision.reason
            );
            self.refresh().await;
        } else {
            log::debug!("dashboard up-to-date after '{}'", doc_name);
        }
        decision
    }

    /// Run a full corpus scan and publish the result atomically.
    pub async fn refresh(&self) -> Arc<VaultSnapshot> {
        let snapshot = Arc::new(self.analyzer.analyze_all(&Category::ALL).await);

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.publish(&snapshot) {
                log::warn!("dashboard sink failed: {}", e);
            }
        }

        *self.current.lock() = Some(Published {
            snapshot: snapshot.clone(),
            at: Utc::now(),
        });
        snapshot
    }
}
