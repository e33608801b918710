//! Core vault types shared across modules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The category a vault document belongs to. Maps one-to-one onto a
/// folder under the vault root.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Meeting,
    Person,
    Company,
    Technology,
    Task,
}

impl Category {
    /// Every category, in dashboard display order.
    pub const ALL: [Category; 5] = [
        Category::Meeting,
        Category::Task,
        Category::Person,
        Category::Company,
        Category::Technology,
    ];

    /// Categories whose documents are graph nodes with back-references.
    pub const GRAPH: [Category; 4] = [
        Category::Person,
        Category::Company,
        Category::Technology,
        Category::Task,
    ];

    /// Vault folder name for this category.
    pub fn folder(&self) -> &'static str {
        match self {
            Category::Meeting => "Meetings",
            Category::Person => "People",
            Category::Company => "Companies",
            Category::Technology => "Technologies",
            Category::Task => "Tasks",
        }
    }

    /// String label for serialization and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Meeting => "meeting",
            Category::Person => "person",
            Category::Company => "company",
            Category::Technology => "technology",
            Category::Task => "task",
        }
    }

    /// The `Type:` field value written into new documents.
    pub fn type_label(&self) -> &'static str {
        match self {
            Category::Meeting => "Meeting",
            Category::Person => "Person",
            Category::Company => "Company",
            Category::Technology => "Technology",
            Category::Task => "Task",
        }
    }

    /// Parse from a vault folder name.
    pub fn from_folder(folder: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.folder() == folder)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority tiers for task documents. Declaration order is rank order:
/// `Critical` sorts first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Lenient parse from document text ("Critical", "high", ...).
    pub fn parse(s: &str) -> Option<Priority> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(Priority::Critical),
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

/// Handle to a vault document, returned from upserts so callers can build
/// cross-links without re-deriving identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub category: Category,
    pub id: String,
    pub display_name: String,
}

impl DocumentReference {
    /// Wiki-style cross-link, e.g. `[[People/Sarah-Chen|Sarah Chen]]`.
    pub fn wiki_link(&self) -> String {
        format!(
            "[[{}/{}|{}]]",
            self.category.folder(),
            self.id,
            self.display_name
        )
    }
}

/// Counts of graph nodes touched while processing one source document.
/// Feeds the dashboard refresh policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewNodeCounts {
    /// Critical-priority tasks in the triggering document.
    pub critical_tasks: usize,
    /// High-priority tasks in the triggering document.
    pub high_priority_tasks: usize,
    /// All tasks in the triggering document.
    pub total_tasks: usize,
    /// Newly created company nodes.
    pub companies: usize,
    /// Newly created person nodes.
    pub people: usize,
    /// Newly created technology nodes.
    pub technologies: usize,
}
