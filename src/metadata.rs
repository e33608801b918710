//! Per-document derived metadata.
//!
//! Extracts the facts the analytics layer aggregates over: dates from
//! identifiers and content, `**Priority:**` / `Status:` / `Category:`
//! header fields, relationship classification, and `[[...]]` cross-link
//! counts. Extraction is lenient — a field that doesn't parse is simply
//! absent.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{Category, Priority};
use crate::util::display_name_from_id;

/// Parsed facts about one vault document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMetadata {
    pub title: String,
    /// Meeting date (from the identifier) or last interaction date
    /// (most recent date mentioned in content).
    pub date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<String>,
    /// Relationship classification: client/vendor/partner/internal/... .
    pub relationship: Option<String>,
    pub tech_category: Option<String>,
    /// Cross-links to meeting documents (entity self-links excluded).
    pub reference_count: usize,
}

// Compile-once patterns via OnceLock.
fn re_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap())
}

fn re_priority() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\*\*Priority:\*\*\s*(\w+)").unwrap())
}

fn re_due() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\*\*(?:Due|Deadline):\*\*\s*(\d{4}-\d{2}-\d{2})").unwrap())
}

fn re_status() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^Status:\s*(.+)$").unwrap())
}

fn re_tech_category() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^Category:\s*(.+)$").unwrap())
}

fn re_relationship() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^\*\*Relationship[^:]*:\*\*\s*(.+)$").unwrap())
}

fn re_title() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap())
}

/// Derive metadata for one document.
pub fn derive(category: Category, id: &str, content: &str) -> DocMetadata {
    match category {
        Category::Meeting => derive_meeting(id),
        Category::Task => derive_task(id, content),
        Category::Person => derive_person(id, content),
        Category::Company => derive_company(id, content),
        Category::Technology => derive_technology(id, content),
    }
}

fn derive_meeting(id: &str) -> DocMetadata {
    DocMetadata {
        title: meeting_title(id),
        date: date_from_identifier(id),
        ..DocMetadata::default()
    }
}

fn derive_task(id: &str, content: &str) -> DocMetadata {
    DocMetadata {
        title: title_from_content(content).unwrap_or_else(|| display_name_from_id(id)),
        priority: re_priority()
            .captures(content)
            .and_then(|c| Priority::parse(&c[1])),
        due_date: re_due()
            .captures(content)
            .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok()),
        status: capture_trimmed(re_status(), content),
        reference_count: count_meeting_references(content),
        ..DocMetadata::default()
    }
}

fn derive_person(id: &str, content: &str) -> DocMetadata {
    DocMetadata {
        title: title_from_content(content).unwrap_or_else(|| display_name_from_id(id)),
        date: last_date_mentioned(content),
        relationship: classify_relationship(content),
        reference_count: count_meeting_references(content),
        ..DocMetadata::default()
    }
}

fn derive_company(id: &str, content: &str) -> DocMetadata {
    DocMetadata {
        title: title_from_content(content).unwrap_or_else(|| display_name_from_id(id)),
        relationship: classify_relationship(content),
        reference_count: count_meeting_references(content),
        ..DocMetadata::default()
    }
}

fn derive_technology(id: &str, content: &str) -> DocMetadata {
    DocMetadata {
        title: title_from_content(content).unwrap_or_else(|| display_name_from_id(id)),
        status: capture_trimmed(re_status(), content),
        tech_category: capture_trimmed(re_tech_category(), content),
        reference_count: count_meeting_references(content),
        ..DocMetadata::default()
    }
}

/// Date embedded in a document identifier, e.g. "2026-02-17-weekly-sync".
pub fn date_from_identifier(id: &str) -> Option<NaiveDate> {
    re_date()
        .captures(id)
        .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok())
}

/// Meeting title from an identifier: drop the date token, join the rest.
///
/// Example: "2026-02-17-weekly-sync" → "weekly sync"
pub fn meeting_title(id: &str) -> String {
    let stripped = re_date().replace_all(id, "");
    stripped
        .split(['-', '_', ' '])
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_from_content(content: &str) -> Option<String> {
    re_title()
        .captures(content)
        .map(|c| c[1].trim().to_string())
}

fn capture_trimmed(re: &Regex, content: &str) -> Option<String> {
    re.captures(content).map(|c| c[1].trim().to_string())
}

/// Most recent date mentioned anywhere in the content (used as the last
/// interaction date for people). ISO dates compare correctly as strings.
fn last_date_mentioned(content: &str) -> Option<NaiveDate> {
    re_date()
        .find_iter(content)
        .map(|m| m.as_str())
        .max()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Classify a relationship field into a small label set.
fn classify_relationship(content: &str) -> Option<String> {
    let raw = re_relationship().captures(content)?[1].trim().to_lowercase();
    if raw.is_empty() {
        return None;
    }
    for label in ["client", "vendor", "partner", "prospect", "internal", "external"] {
        if raw.contains(label) {
            return Some(label.to_string());
        }
    }
    Some("other".to_string())
}

/// Count cross-links to meeting documents, excluding links back into the
/// entity folders (an entity's own wiki-links to people/companies/etc.).
pub fn count_meeting_references(content: &str) -> usize {
    let total = content.matches("[[").count();
    let self_refs = content.matches("[[People").count()
        + content.matches("[[Companies").count()
        + content.matches("[[Technologies").count()
        + content.matches("[[Tasks").count();
    total.saturating_sub(self_refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_date_and_title_from_identifier() {
        let m = derive(Category::Meeting, "2026-02-17-weekly-sync", "");
        assert_eq!(m.date, NaiveDate::from_ymd_opt(2026, 2, 17));
        assert_eq!(m.title, "weekly sync");
    }

    #[test]
    fn test_meeting_without_date() {
        let m = derive(Category::Meeting, "kickoff_notes", "");
        assert_eq!(m.date, None);
        assert_eq!(m.title, "kickoff notes");
    }

    #[test]
    fn test_task_fields() {
        let content = "# Renew Acme contract\n\nType: Task\nStatus: Open\n**Priority:** Critical\n**Due:** 2026-03-15\n";
        let m = derive(Category::Task, "Renew-Acme-contract", content);
        assert_eq!(m.title, "Renew Acme contract");
        assert_eq!(m.priority, Some(Priority::Critical));
        assert_eq!(m.due_date, NaiveDate::from_ymd_opt(2026, 3, 15));
        assert_eq!(m.status.as_deref(), Some("Open"));
    }

    #[test]
    fn test_task_deadline_alias() {
        let m = derive(Category::Task, "t", "**Deadline:** 2026-01-31\n");
        assert_eq!(m.due_date, NaiveDate::from_ymd_opt(2026, 1, 31));
    }

    #[test]
    fn test_person_last_interaction_is_max_date() {
        let content = "# Sarah Chen\n\n## Meeting History\n- [[2026-01-05-sync]] - 2026-01-05\n- [[2026-02-17-review]] - 2026-02-17\n";
        let m = derive(Category::Person, "Sarah-Chen", content);
        assert_eq!(m.date, NaiveDate::from_ymd_opt(2026, 2, 17));
        assert_eq!(m.reference_count, 2);
    }

    #[test]
    fn test_company_relationship_classification() {
        let content = "# Acme\n\n**Relationship to Us:** Long-term client (paying)\n";
        let m = derive(Category::Company, "Acme", content);
        assert_eq!(m.relationship.as_deref(), Some("client"));
    }

    #[test]
    fn test_relationship_unmatched_label_is_other() {
        let content = "**Relationship:** friendly competitor\n";
        let m = derive(Category::Company, "X", content);
        assert_eq!(m.relationship.as_deref(), Some("other"));
    }

    #[test]
    fn test_technology_category_and_status() {
        let content = "# PostgreSQL\n\nType: Technology\nCategory: Database\nStatus: In Use\n";
        let m = derive(Category::Technology, "PostgreSQL", content);
        assert_eq!(m.tech_category.as_deref(), Some("Database"));
        assert_eq!(m.status.as_deref(), Some("In Use"));
    }

    #[test]
    fn test_reference_count_excludes_entity_links() {
        let content = "- [[2026-02-17-sync]] - 2026-02-17\nSee [[People/Sarah-Chen|Sarah]] and [[Companies/Acme|Acme]]\n";
        assert_eq!(count_meeting_references(content), 1);
    }

    #[test]
    fn test_title_falls_back_to_identifier() {
        let m = derive(Category::Person, "Sarah-Chen", "no heading here");
        assert_eq!(m.title, "Sarah Chen");
    }
}
