//! Incremental knowledge-graph engine for markdown meeting vaults.
//!
//! The vault is a directory of markdown documents organized by category
//! (Meetings, People, Companies, Technologies, Tasks). As new meeting
//! documents land, [`graph::NodeManager`] creates or updates one entity
//! document per person/company/technology/task mentioned, appending
//! back-references idempotently. [`analyzer::CorpusAnalyzer`] scans the
//! corpus — accelerated by an mtime-validated [`cache::MetadataCache`] —
//! to produce per-category aggregate statistics, and
//! [`orchestrator::DashboardOrchestrator`] decides via [`refresh`] when a
//! fresh snapshot is worth computing.
//!
//! Everything network-bound (the AI context collaborator) sits behind the
//! [`collaborator::ContextProvider`] trait with a hard timeout and an
//! empty-context fallback, so document processing never blocks on it.

pub mod analyzer;
pub mod cache;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod orchestrator;
pub mod refresh;
pub mod sections;
pub mod store;
pub mod types;
pub mod util;

pub use error::{CollaboratorError, VaultError};
pub use store::VaultStore;
pub use types::{Category, DocumentReference};
