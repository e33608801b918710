//! Engine configuration.
//!
//! All tunables are supplied by the host process at construction time and
//! deserialize from its config file. Defaults match production behavior;
//! no environment reads or ambient singletons here.

use serde::Deserialize;

pub use crate::refresh::RefreshThresholds;

/// Metadata cache sizing and freshness.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Maximum cached documents. At capacity the oldest 10% are evicted.
    pub max_entries: usize,
    /// Seconds before a cache entry expires regardless of mtime.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_entries: 1000,
            ttl_secs: 300,
        }
    }
}

/// Corpus scan parallelism.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    /// Concurrent category scans during `analyze_all`.
    pub worker_width: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig { worker_width: 4 }
    }
}

/// External AI context collaborator endpoint and budget.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollaboratorConfig {
    /// HTTP endpoint of the context service. None disables lookups
    /// (nodes are created with empty descriptive fields).
    pub endpoint: Option<String>,
    /// Hard timeout per lookup. On expiry node creation proceeds with
    /// empty fields.
    pub timeout_secs: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        CollaboratorConfig {
            endpoint: None,
            timeout_secs: 5,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub analyzer: AnalyzerConfig,
    pub collaborator: CollaboratorConfig,
    pub refresh: RefreshThresholds,
}
