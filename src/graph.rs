//! Graph node creation and idempotent back-reference maintenance.
//!
//! One document per distinct entity or task. Reprocessing the same
//! meeting is a no-op: back-reference identity is the meeting id, and an
//! existing reference is never appended twice. Creation asks the context
//! collaborator for descriptive fields, falling back to empty fields on
//! any failure — the pipeline never stalls on the network.
//!
//! Concurrent upserts against the same (category, identifier) pair are
//! not internally serialized; route one run's upserts through a single
//! task (as [`NodeManager::upsert_all`] does) or hold a per-identifier
//! lock outside.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::collaborator::{self, ContextProvider, ContextRequest, EntityContext};
use crate::error::VaultError;
use crate::sections::EntityDoc;
use crate::store::VaultStore;
use crate::types::{Category, DocumentReference, NewNodeCounts, Priority};
use crate::util::normalize_identifier;

const DATE_FMT: &str = "%Y-%m-%d";

/// Result of a single upsert.
#[derive(Debug, Clone)]
pub struct Upserted {
    pub reference: DocumentReference,
    /// True when the document was created by this call (vs. updated).
    pub created: bool,
}

/// Entities detected in one meeting, as handed over by the extraction
/// pipeline.
#[derive(Debug, Clone, Default)]
pub struct MeetingEntities {
    pub people: Vec<String>,
    pub companies: Vec<String>,
    pub technologies: Vec<String>,
    pub tasks: Vec<TaskSeed>,
}

/// A task extracted from a meeting, with its known attributes. Task
/// documents are synthesized from the seed directly; no collaborator
/// lookup needed.
#[derive(Debug, Clone)]
pub struct TaskSeed {
    pub title: String,
    pub priority: Priority,
    pub due: Option<NaiveDate>,
}

/// Cross-link handles for everything touched while processing one
/// meeting, plus the counts the refresh policy consumes.
#[derive(Debug, Clone, Default)]
pub struct EntityLinks {
    pub people: Vec<DocumentReference>,
    pub companies: Vec<DocumentReference>,
    pub technologies: Vec<DocumentReference>,
    pub tasks: Vec<DocumentReference>,
    pub counts: NewNodeCounts,
}

/// Creates and updates graph node documents.
pub struct NodeManager {
    store: Arc<VaultStore>,
    provider: Arc<dyn ContextProvider>,
    lookup_timeout: Duration,
}

impl NodeManager {
    pub fn new(
        store: Arc<VaultStore>,
        provider: Arc<dyn ContextProvider>,
        lookup_timeout: Duration,
    ) -> Self {
        NodeManager {
            store,
            provider,
            lookup_timeout,
        }
    }

    /// Create the node document for `entity_name` if absent, otherwise
    /// append a back-reference to the source meeting (idempotently) and
    /// bump the `Last Updated` field.
    ///
    /// The write is all-or-nothing: on error the node is not created and
    /// not half-updated.
    pub async fn upsert(
        &self,
        category: Category,
        entity_name: &str,
        meeting_id: &str,
        meeting_date: NaiveDate,
        excerpt: &str,
    ) -> Result<Upserted, VaultError> {
        let id = normalize_identifier(entity_name);
        let date = meeting_date.format(DATE_FMT).to_string();
        let reference = DocumentReference {
            category,
            id: id.clone(),
            display_name: entity_name.to_string(),
        };

        if self.store.exists(category, &id) {
            let content = self.store.read(category, &id)?;
            let mut doc = EntityDoc::parse(&content);
            if doc.add_reference(meeting_id, &date) {
                doc.set_field("Last Updated", &date);
                self.store.write(category, &id, &doc.render())?;
                log::debug!("updated {} node {}", category, id);
            } else {
                log::debug!("{} node {} already references {}", category, id, meeting_id);
            }
            return Ok(Upserted {
                reference,
                created: false,
            });
        }

        let context = self.lookup_context(category, entity_name, excerpt).await;
        let content = render_new_node(category, entity_name, meeting_id, &date, &context);
        self.store.write(category, &id, &content)?;
        log::info!("created {} node {}", category, id);

        Ok(Upserted {
            reference,
            created: true,
        })
    }

    /// Create or update a task node from an extracted seed. Fields come
    /// from the seed, not the collaborator.
    pub async fn upsert_task(
        &self,
        seed: &TaskSeed,
        meeting_id: &str,
        meeting_date: NaiveDate,
    ) -> Result<Upserted, VaultError> {
        let id = normalize_identifier(&seed.title);
        let date = meeting_date.format(DATE_FMT).to_string();
        let reference = DocumentReference {
            category: Category::Task,
            id: id.clone(),
            display_name: seed.title.clone(),
        };

        if self.store.exists(Category::Task, &id) {
            let content = self.store.read(Category::Task, &id)?;
            let mut doc = EntityDoc::parse(&content);
            if doc.add_reference(meeting_id, &date) {
                doc.set_field("Last Updated", &date);
                self.store.write(Category::Task, &id, &doc.render())?;
            }
            return Ok(Upserted {
                reference,
                created: false,
            });
        }

        let mut context = EntityContext::new();
        context.insert("priority".to_string(), seed.priority.as_str().to_string());
        if let Some(due) = seed.due {
            context.insert("due".to_string(), due.format(DATE_FMT).to_string());
        }
        let content = render_new_node(Category::Task, &seed.title, meeting_id, &date, &context);
        self.store.write(Category::Task, &id, &content)?;
        log::info!("created task node {}", id);

        Ok(Upserted {
            reference,
            created: true,
        })
    }

    /// Process every entity detected in one meeting, sequentially (which
    /// also serializes same-identifier upserts within the run).
    ///
    /// Per-entity failures are logged and skipped; the batch always
    /// completes and reports what it managed to link.
    pub async fn upsert_all(
        &self,
        entities: &MeetingEntities,
        meeting_id: &str,
        meeting_date: NaiveDate,
        excerpt: &str,
    ) -> EntityLinks {
        let mut links = EntityLinks::default();

        for person in &entities.people {
            match self
                .upsert(Category::Person, person, meeting_id, meeting_date, excerpt)
                .await
            {
                Ok(up) => {
                    if up.created {
                        links.counts.people += 1;
                    }
                    links.people.push(up.reference);
                }
                Err(e) => log::warn!("skipping person '{}': {}", person, e),
            }
        }

        for company in &entities.companies {
            match self
                .upsert(Category::Company, company, meeting_id, meeting_date, excerpt)
                .await
            {
                Ok(up) => {
                    if up.created {
                        links.counts.companies += 1;
                    }
                    links.companies.push(up.reference);
                }
                Err(e) => log::warn!("skipping company '{}': {}", company, e),
            }
        }

        for technology in &entities.technologies {
            match self
                .upsert(
                    Category::Technology,
                    technology,
                    meeting_id,
                    meeting_date,
                    excerpt,
                )
                .await
            {
                Ok(up) => {
                    if up.created {
                        links.counts.technologies += 1;
                    }
                    links.technologies.push(up.reference);
                }
                Err(e) => log::warn!("skipping technology '{}': {}", technology, e),
            }
        }

        for seed in &entities.tasks {
            match self.upsert_task(seed, meeting_id, meeting_date).await {
                Ok(up) => {
                    links.counts.total_tasks += 1;
                    match seed.priority {
                        Priority::Critical => links.counts.critical_tasks += 1,
                        Priority::High => links.counts.high_priority_tasks += 1,
                        _ => {}
                    }
                    links.tasks.push(up.reference);
                }
                Err(e) => log::warn!("skipping task '{}': {}", seed.title, e),
            }
        }

        let total =
            links.people.len() + links.companies.len() + links.technologies.len() + links.tasks.len();
        log::info!("linked {} entities for meeting {}", total, meeting_id);
        links
    }

    /// Rewrite the meeting document's entity-connection fields with
    /// wiki-links to the upserted nodes.
    pub fn link_entities(&self, meeting_id: &str, links: &EntityLinks) -> Result<(), VaultError> {
        let content = self.store.read(Category::Meeting, meeting_id)?;
        let mut doc = EntityDoc::parse(&content);

        let mut changed = false;
        changed |= set_link_field(&mut doc, "People Mentioned", &links.people);
        changed |= set_link_field(&mut doc, "Companies Discussed", &links.companies);
        changed |= set_link_field(&mut doc, "Technologies Referenced", &links.technologies);

        if changed {
            self.store
                .write(Category::Meeting, meeting_id, &doc.render())?;
        } else {
            log::debug!("meeting {} has no entity-connection fields", meeting_id);
        }
        Ok(())
    }

    /// Advisory scan for entity documents with no back-references.
    /// Reports only; orphan cleanup is a manual decision.
    pub fn find_orphans(&self) -> Vec<DocumentReference> {
        let mut orphans = Vec::new();
        for category in [Category::Person, Category::Company, Category::Technology] {
            let ids = match self.store.list(category) {
                Ok(ids) => ids,
                Err(e) => {
                    log::warn!("orphan scan of {} failed: {}", category, e);
                    continue;
                }
            };
            for id in ids {
                match self.store.read(category, &id) {
                    Ok(content) => {
                        let doc = EntityDoc::parse(&content);
                        if doc.references().count() == 0 {
                            let display_name = doc
                                .title()
                                .map(str::to_string)
                                .unwrap_or_else(|| crate::util::display_name_from_id(&id));
                            orphans.push(DocumentReference {
                                category,
                                id,
                                display_name,
                            });
                        }
                    }
                    Err(e) => log::warn!("orphan scan skipping {}/{}: {}", category, id, e),
                }
            }
        }
        orphans
    }

    async fn lookup_context(
        &self,
        category: Category,
        entity_name: &str,
        excerpt: &str,
    ) -> EntityContext {
        let request = ContextRequest {
            entity_name: entity_name.to_string(),
            category,
            excerpt: excerpt.to_string(),
        };
        match collaborator::lookup_with_timeout(
            self.provider.as_ref(),
            &request,
            self.lookup_timeout,
        )
        .await
        {
            Ok(context) => context,
            Err(e) => {
                log::warn!(
                    "context lookup for '{}' failed ({}); creating with empty fields",
                    entity_name,
                    e
                );
                EntityContext::new()
            }
        }
    }
}

fn set_link_field(doc: &mut EntityDoc, label: &str, refs: &[DocumentReference]) -> bool {
    let value = if refs.is_empty() {
        "None detected".to_string()
    } else {
        refs.iter()
            .map(|r| r.wiki_link())
            .collect::<Vec<_>>()
            .join(", ")
    };
    doc.set_field(label, &value)
}

/// Synthesize a new node document from the category template.
fn render_new_node(
    category: Category,
    name: &str,
    meeting_id: &str,
    date: &str,
    context: &EntityContext,
) -> String {
    let get = |key: &str| context.get(key).map(String::as_str).unwrap_or("").to_string();

    match category {
        Category::Person => format!(
            "# {name}\n\n\
             Type: Person\n\
             Status: Active\n\
             First Mentioned: {date}\n\n\
             ## Contact Information\n\
             Email: {email}\n\
             Role: {role}\n\
             Company: {company}\n\n\
             ## Relationship Context\n\
             **Relationship:** {relationship}\n\
             **Department:** {department}\n\n\
             ## Meeting History\n\
             - [[{meeting_id}]] - {date}\n\n\
             ## Notes\n\
             {notes}\n\n\
             ---\n\
             Tags: #person #contact\n\
             Created: {date}\n\
             Last Updated: {date}\n",
            name = name,
            date = date,
            meeting_id = meeting_id,
            email = get("email"),
            role = get("role"),
            company = get("company"),
            relationship = get("relationship"),
            department = get("department"),
            notes = get("notes"),
        ),
        Category::Company => format!(
            "# {name}\n\n\
             Type: Company\n\
             Status: Active\n\
             First Mentioned: {date}\n\n\
             ## Company Information\n\
             Industry: {industry}\n\
             Size: {size}\n\
             Location: {location}\n\n\
             ## Relationship Context\n\
             **Relationship:** {relationship}\n\
             **Business Needs:** {business_needs}\n\n\
             ## Meeting History\n\
             - [[{meeting_id}]] - {date}\n\n\
             ## Notes\n\
             {notes}\n\n\
             ---\n\
             Tags: #company #business\n\
             Created: {date}\n\
             Last Updated: {date}\n",
            name = name,
            date = date,
            meeting_id = meeting_id,
            industry = get("industry"),
            size = get("size"),
            location = get("location"),
            relationship = get("relationship"),
            business_needs = get("business_needs"),
            notes = get("notes"),
        ),
        Category::Technology => format!(
            "# {name}\n\n\
             Type: Technology\n\
             Category: {tech_category}\n\
             Status: {status}\n\
             First Mentioned: {date}\n\n\
             ## Overview\n\
             {usage}\n\n\
             ## Business Value\n\
             {business_value}\n\n\
             ## Meeting References\n\
             - [[{meeting_id}]] - {date}\n\n\
             ## Notes\n\
             {notes}\n\n\
             ---\n\
             Tags: #technology #tools\n\
             Created: {date}\n\
             Last Updated: {date}\n",
            name = name,
            date = date,
            meeting_id = meeting_id,
            tech_category = get("category"),
            status = if context.contains_key("status") {
                get("status")
            } else {
                "In Use".to_string()
            },
            usage = get("usage"),
            business_value = get("business_value"),
            notes = get("notes"),
        ),
        Category::Task => format!(
            "# {name}\n\n\
             Type: Task\n\
             Status: {status}\n\
             **Priority:** {priority}\n\
             **Due:** {due}\n\
             First Mentioned: {date}\n\n\
             ## Meeting References\n\
             - [[{meeting_id}]] - {date}\n\n\
             ## Notes\n\
             {notes}\n\n\
             ---\n\
             Tags: #task\n\
             Created: {date}\n\
             Last Updated: {date}\n",
            name = name,
            date = date,
            meeting_id = meeting_id,
            status = if context.contains_key("status") {
                get("status")
            } else {
                "Open".to_string()
            },
            priority = if context.contains_key("priority") {
                get("priority")
            } else {
                Priority::Medium.as_str().to_string()
            },
            due = get("due"),
            notes = get("notes"),
        ),
        Category::Meeting => format!(
            "# {name}\n\nType: Meeting\nDate: {date}\n",
            name = name,
            date = date
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::NullContextProvider;
    use crate::error::CollaboratorError;
    use async_trait::async_trait;

    struct FixedProvider;

    #[async_trait]
    impl ContextProvider for FixedProvider {
        async fn lookup(
            &self,
            request: &ContextRequest,
        ) -> Result<EntityContext, CollaboratorError> {
            let mut context = EntityContext::new();
            match request.category {
                Category::Person => {
                    context.insert("role".into(), "VP Engineering".into());
                    context.insert("company".into(), "Acme".into());
                }
                Category::Company => {
                    context.insert("industry".into(), "Manufacturing".into());
                    context.insert("relationship".into(), "client".into());
                }
                _ => {}
            }
            Ok(context)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ContextProvider for FailingProvider {
        async fn lookup(
            &self,
            _request: &ContextRequest,
        ) -> Result<EntityContext, CollaboratorError> {
            Err(CollaboratorError::Failed("service unavailable".into()))
        }
    }

    fn manager_with(
        provider: Arc<dyn ContextProvider>,
    ) -> (tempfile::TempDir, Arc<VaultStore>, NodeManager) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(VaultStore::new(dir.path()));
        let manager = NodeManager::new(store.clone(), provider, Duration::from_secs(5));
        (dir, store, manager)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 17).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_read_back() {
        let (_dir, store, manager) = manager_with(Arc::new(FixedProvider));

        let up = manager
            .upsert(
                Category::Person,
                "Sarah Chen",
                "2026-02-17-kickoff",
                date(),
                "Sarah leads the platform team",
            )
            .await
            .unwrap();

        assert!(up.created);
        assert_eq!(up.reference.id, "Sarah-Chen");

        let content = store.read(Category::Person, "Sarah-Chen").unwrap();
        assert!(content.contains("# Sarah Chen"));
        assert!(content.contains("Role: VP Engineering"));
        assert!(content.contains("- [[2026-02-17-kickoff]] - 2026-02-17"));
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_single_reference() {
        let (_dir, store, manager) = manager_with(Arc::new(NullContextProvider));

        for _ in 0..2 {
            manager
                .upsert(Category::Company, "Acme Corp", "2026-02-17-sync", date(), "")
                .await
                .unwrap();
        }

        let content = store.read(Category::Company, "Acme-Corp").unwrap();
        let occurrences = content.matches("[[2026-02-17-sync]]").count();
        assert_eq!(occurrences, 1);
    }

    #[tokio::test]
    async fn test_second_meeting_appends_and_bumps_last_updated() {
        let (_dir, store, manager) = manager_with(Arc::new(NullContextProvider));

        manager
            .upsert(Category::Company, "Acme Corp", "2026-02-17-sync", date(), "")
            .await
            .unwrap();
        let later = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let up = manager
            .upsert(Category::Company, "Acme Corp", "2026-03-02-review", later, "")
            .await
            .unwrap();

        assert!(!up.created);
        let content = store.read(Category::Company, "Acme-Corp").unwrap();
        let doc = EntityDoc::parse(&content);
        assert_eq!(doc.references().count(), 2);
        assert_eq!(doc.field("Last Updated"), Some("2026-03-02"));
    }

    #[tokio::test]
    async fn test_collaborator_failure_creates_with_empty_fields() {
        let (_dir, store, manager) = manager_with(Arc::new(FailingProvider));

        let up = manager
            .upsert(Category::Person, "Joe Smith", "2026-02-17-sync", date(), "")
            .await
            .unwrap();

        assert!(up.created);
        let content = store.read(Category::Person, "Joe-Smith").unwrap();
        let doc = EntityDoc::parse(&content);
        assert_eq!(doc.field("Role"), Some(""));
        assert_eq!(doc.references().count(), 1);
    }

    #[tokio::test]
    async fn test_upsert_task_from_seed() {
        let (_dir, store, manager) = manager_with(Arc::new(NullContextProvider));

        let seed = TaskSeed {
            title: "Renew Acme contract".to_string(),
            priority: Priority::Critical,
            due: NaiveDate::from_ymd_opt(2026, 3, 15),
        };
        let up = manager
            .upsert_task(&seed, "2026-02-17-sync", date())
            .await
            .unwrap();

        assert!(up.created);
        let content = store.read(Category::Task, "Renew-Acme-contract").unwrap();
        assert!(content.contains("**Priority:** Critical"));
        assert!(content.contains("**Due:** 2026-03-15"));
    }

    #[tokio::test]
    async fn test_upsert_all_counts_created_nodes() {
        let (_dir, _store, manager) = manager_with(Arc::new(NullContextProvider));

        let entities = MeetingEntities {
            people: vec!["Sarah Chen".into(), "Joe Smith".into()],
            companies: vec!["Acme Corp".into()],
            technologies: vec!["PostgreSQL".into()],
            tasks: vec![
                TaskSeed {
                    title: "Ship migration plan".into(),
                    priority: Priority::Critical,
                    due: None,
                },
                TaskSeed {
                    title: "Update runbook".into(),
                    priority: Priority::Low,
                    due: None,
                },
            ],
        };

        let links = manager
            .upsert_all(&entities, "2026-02-17-kickoff", date(), "")
            .await;

        assert_eq!(links.counts.people, 2);
        assert_eq!(links.counts.companies, 1);
        assert_eq!(links.counts.technologies, 1);
        assert_eq!(links.counts.total_tasks, 2);
        assert_eq!(links.counts.critical_tasks, 1);
        assert_eq!(links.counts.high_priority_tasks, 0);

        // Reprocessing the same meeting creates nothing new
        let links = manager
            .upsert_all(&entities, "2026-02-17-kickoff", date(), "")
            .await;
        assert_eq!(links.counts.people, 0);
        assert_eq!(links.counts.companies, 0);
        assert_eq!(links.people.len(), 2);
    }

    #[tokio::test]
    async fn test_link_entities_rewrites_meeting_fields() {
        let (_dir, store, manager) = manager_with(Arc::new(NullContextProvider));

        store
            .write(
                Category::Meeting,
                "2026-02-17-kickoff",
                "# Kickoff\n\nPeople Mentioned:\nCompanies Discussed:\nTechnologies Referenced:\n",
            )
            .unwrap();

        let entities = MeetingEntities {
            people: vec!["Sarah Chen".into()],
            companies: vec!["Acme Corp".into()],
            ..MeetingEntities::default()
        };
        let links = manager
            .upsert_all(&entities, "2026-02-17-kickoff", date(), "")
            .await;
        manager.link_entities("2026-02-17-kickoff", &links).unwrap();

        let content = store.read(Category::Meeting, "2026-02-17-kickoff").unwrap();
        assert!(content.contains("People Mentioned: [[People/Sarah-Chen|Sarah Chen]]"));
        assert!(content.contains("Companies Discussed: [[Companies/Acme-Corp|Acme Corp]]"));
        assert!(content.contains("Technologies Referenced: None detected"));
    }

    #[tokio::test]
    async fn test_find_orphans() {
        let (_dir, store, manager) = manager_with(Arc::new(NullContextProvider));

        manager
            .upsert(Category::Person, "Sarah Chen", "2026-02-17-sync", date(), "")
            .await
            .unwrap();
        store
            .write(Category::Person, "Ghost", "# Ghost\n\nType: Person\n")
            .unwrap();

        let orphans = manager.find_orphans();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, "Ghost");
    }
}
