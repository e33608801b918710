//! Typed section model for vault documents.
//!
//! A document parses once into a sequence of typed blocks — header fields
//! (`Label: value` / `**Label:** value`), the back-reference list, and
//! verbatim text — gets mutated through the typed structure, and
//! re-serializes. Unrecognized content round-trips untouched, so a
//! rewrite never mangles prose.
//!
//! Back-reference identity is the meeting identifier, not the formatted
//! line: re-adding a reference with a different date format is still a
//! no-op.

const REFERENCE_HEADINGS: [&str; 2] = ["Meeting History", "Meeting References"];

/// A back-reference to a source meeting document.
///
/// `target` is the raw wiki-link interior (may carry a `|alias`); identity
/// is the part before the alias separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRef {
    pub target: String,
    pub date: String,
}

impl MeetingRef {
    /// The meeting identifier this reference points at.
    pub fn meeting_id(&self) -> &str {
        self.target.split('|').next().unwrap_or(&self.target)
    }

    fn parse_line(line: &str) -> Option<MeetingRef> {
        let trimmed = line.trim();
        let rest = trimmed.strip_prefix("- [[")?;
        let end = rest.find("]]")?;
        let target = &rest[..end];
        let tail = rest[end + 2..].trim();
        let date = tail.strip_prefix('-').map(str::trim).unwrap_or("").to_string();
        Some(MeetingRef {
            target: target.to_string(),
            date,
        })
    }

    fn render(&self) -> String {
        if self.date.is_empty() {
            format!("- [[{}]]", self.target)
        } else {
            format!("- [[{}]] - {}", self.target, self.date)
        }
    }
}

#[derive(Debug, Clone)]
enum Block {
    /// `Label: value` or `**Label:** value` line.
    Field {
        label: String,
        value: String,
        bold: bool,
    },
    /// A reference-list section: heading plus its contiguous entries.
    References {
        heading: String,
        refs: Vec<MeetingRef>,
    },
    /// Verbatim lines (headings, prose, blank lines).
    Text(String),
}

/// A parsed vault document.
#[derive(Debug, Clone)]
pub struct EntityDoc {
    blocks: Vec<Block>,
}

impl EntityDoc {
    /// Parse document content. Never fails; unrecognized lines are kept
    /// as verbatim text.
    pub fn parse(content: &str) -> EntityDoc {
        let mut blocks: Vec<Block> = Vec::new();
        let mut text_run: Vec<&str> = Vec::new();
        let mut lines = content.lines().peekable();

        fn flush(blocks: &mut Vec<Block>, run: &mut Vec<&str>) {
            if !run.is_empty() {
                blocks.push(Block::Text(run.join("\n")));
                run.clear();
            }
        }

        while let Some(line) = lines.next() {
            if let Some(heading) = reference_heading(line) {
                flush(&mut blocks, &mut text_run);
                let mut refs = Vec::new();
                while let Some(next) = lines.peek() {
                    match MeetingRef::parse_line(next) {
                        Some(r) => {
                            refs.push(r);
                            lines.next();
                        }
                        None => break,
                    }
                }
                blocks.push(Block::References {
                    heading: heading.to_string(),
                    refs,
                });
            } else if let Some((label, value, bold)) = parse_field(line) {
                flush(&mut blocks, &mut text_run);
                blocks.push(Block::Field { label, value, bold });
            } else {
                text_run.push(line);
            }
        }
        flush(&mut blocks, &mut text_run);

        EntityDoc { blocks }
    }

    /// Serialize back to document text (trailing newline included).
    pub fn render(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Field { label, value, bold } => {
                    let rendered = match (*bold, value.is_empty()) {
                        (true, true) => format!("**{}:**", label),
                        (true, false) => format!("**{}:** {}", label, value),
                        (false, true) => format!("{}:", label),
                        (false, false) => format!("{}: {}", label, value),
                    };
                    out.push(rendered);
                }
                Block::References { heading, refs } => {
                    out.push(format!("## {}", heading));
                    for r in refs {
                        out.push(r.render());
                    }
                }
                Block::Text(text) => out.push(text.clone()),
            }
        }
        let mut rendered = out.join("\n");
        rendered.push('\n');
        rendered
    }

    /// First `# ` heading, if any.
    pub fn title(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Text(text) => text
                .lines()
                .find_map(|l| l.strip_prefix("# ").map(str::trim)),
            _ => None,
        })
    }

    /// Value of the first field with this label (case-insensitive).
    pub fn field(&self, label: &str) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Field {
                label: l, value, ..
            } if l.eq_ignore_ascii_case(label) => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set the first field with this label. Returns false if the document
    /// has no such field.
    pub fn set_field(&mut self, label: &str, value: &str) -> bool {
        for block in &mut self.blocks {
            if let Block::Field {
                label: l,
                value: v,
                ..
            } = block
            {
                if l.eq_ignore_ascii_case(label) {
                    *v = value.to_string();
                    return true;
                }
            }
        }
        false
    }

    /// All back-references, across every reference section.
    pub fn references(&self) -> impl Iterator<Item = &MeetingRef> {
        self.blocks.iter().flat_map(|b| match b {
            Block::References { refs, .. } => refs.as_slice(),
            _ => &[],
        })
    }

    /// Append a back-reference unless one with the same meeting id is
    /// already present. Creates a `## Meeting History` section if the
    /// document has none. Returns true when a reference was added.
    pub fn add_reference(&mut self, meeting_id: &str, date: &str) -> bool {
        if self.references().any(|r| r.meeting_id() == meeting_id) {
            return false;
        }

        let new_ref = MeetingRef {
            target: meeting_id.to_string(),
            date: date.to_string(),
        };
        for block in &mut self.blocks {
            if let Block::References { refs, .. } = block {
                refs.push(new_ref);
                return true;
            }
        }

        // No reference section yet
        self.blocks.push(Block::Text(String::new()));
        self.blocks.push(Block::References {
            heading: REFERENCE_HEADINGS[0].to_string(),
            refs: vec![new_ref],
        });
        true
    }
}

fn reference_heading(line: &str) -> Option<&str> {
    let heading = line.strip_prefix("## ")?.trim();
    REFERENCE_HEADINGS
        .iter()
        .find(|&&h| h == heading)
        .map(|_| heading)
}

/// Recognize `**Label:** value` and `Label: value` lines. List items and
/// headings are never fields.
fn parse_field(line: &str) -> Option<(String, String, bool)> {
    if line.starts_with('#') || line.trim_start().starts_with('-') || line.starts_with('*') {
        // Bold fields start with ** and are handled below
        if !line.starts_with("**") {
            return None;
        }
    }

    if let Some(rest) = line.strip_prefix("**") {
        let sep = rest.find(":**")?;
        let label = &rest[..sep];
        if label.is_empty() || label.contains('*') {
            return None;
        }
        let value = rest[sep + 3..].trim_start();
        return Some((label.to_string(), value.to_string(), true));
    }

    let sep = line.find(':')?;
    let label = &line[..sep];
    let rest = &line[sep + 1..];
    // A field separator is ": " or a line-ending colon; anything else
    // (e.g. "http://...") is prose.
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    if label.is_empty()
        || label.len() > 40
        || !label.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        || !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '/' || c == '_' || c == '-')
    {
        return None;
    }
    Some((label.to_string(), rest.trim_start().to_string(), false))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON_DOC: &str = "# Sarah Chen\n\nType: Person\nStatus: Active\nFirst Mentioned: 2026-01-05\n\n## Contact Information\nEmail: sarah@acme.com\nRole: VP Engineering\n\n## Meeting History\n- [[2026-01-05-kickoff]] - 2026-01-05\n\n## Notes\nPrefers async updates.\n\n---\nTags: #person #contact\nCreated: 2026-01-05\nLast Updated: 2026-01-05\n";

    #[test]
    fn test_parse_render_round_trip() {
        let doc = EntityDoc::parse(PERSON_DOC);
        assert_eq!(doc.render(), PERSON_DOC);
    }

    #[test]
    fn test_title_and_fields() {
        let doc = EntityDoc::parse(PERSON_DOC);
        assert_eq!(doc.title(), Some("Sarah Chen"));
        assert_eq!(doc.field("Type"), Some("Person"));
        assert_eq!(doc.field("email"), Some("sarah@acme.com"));
        assert_eq!(doc.field("Nonexistent"), None);
    }

    #[test]
    fn test_set_field() {
        let mut doc = EntityDoc::parse(PERSON_DOC);
        assert!(doc.set_field("Last Updated", "2026-02-17"));
        assert_eq!(doc.field("Last Updated"), Some("2026-02-17"));
        assert!(!doc.set_field("Missing Field", "x"));
    }

    #[test]
    fn test_bold_field_round_trip() {
        let content = "**Relationship to Us:** client\n**Priority:** High\n";
        let mut doc = EntityDoc::parse(content);
        assert_eq!(doc.field("Relationship to Us"), Some("client"));
        assert!(doc.set_field("Priority", "Critical"));
        assert_eq!(doc.render(), "**Relationship to Us:** client\n**Priority:** Critical\n");
    }

    #[test]
    fn test_add_reference_appends() {
        let mut doc = EntityDoc::parse(PERSON_DOC);
        assert!(doc.add_reference("2026-02-17-review", "2026-02-17"));
        assert_eq!(doc.references().count(), 2);
        assert!(doc.render().contains("- [[2026-02-17-review]] - 2026-02-17"));
    }

    #[test]
    fn test_add_reference_is_idempotent() {
        let mut doc = EntityDoc::parse(PERSON_DOC);
        assert!(!doc.add_reference("2026-01-05-kickoff", "2026-01-05"));
        assert_eq!(doc.references().count(), 1);
    }

    #[test]
    fn test_reference_identity_ignores_date_formatting() {
        let mut doc = EntityDoc::parse(PERSON_DOC);
        // Same meeting, differently formatted date: still a duplicate
        assert!(!doc.add_reference("2026-01-05-kickoff", "Jan 5, 2026"));
        assert_eq!(doc.references().count(), 1);
    }

    #[test]
    fn test_reference_identity_ignores_alias() {
        let content = "## Meeting History\n- [[2026-01-05-kickoff|Kickoff]] - 2026-01-05\n";
        let mut doc = EntityDoc::parse(content);
        assert!(!doc.add_reference("2026-01-05-kickoff", "2026-01-05"));
    }

    #[test]
    fn test_add_reference_creates_section_when_missing() {
        let mut doc = EntityDoc::parse("# Orphan\n\nType: Person\n");
        assert!(doc.add_reference("2026-02-17-sync", "2026-02-17"));
        let rendered = doc.render();
        assert!(rendered.contains("## Meeting History"));
        assert!(rendered.contains("- [[2026-02-17-sync]] - 2026-02-17"));
    }

    #[test]
    fn test_meeting_references_heading_recognized() {
        let content = "## Meeting References\n- [[2026-01-05-kickoff]] - 2026-01-05\n";
        let doc = EntityDoc::parse(content);
        assert_eq!(doc.references().count(), 1);
        assert_eq!(doc.render(), content);
    }

    #[test]
    fn test_prose_with_colon_round_trips() {
        let content = "## Notes\nNote: follow up next week\nhttp://example.com/page\n";
        let doc = EntityDoc::parse(content);
        assert_eq!(doc.render(), content);
    }

    #[test]
    fn test_checkbox_lines_are_not_references() {
        let content = "## Relationship Status\n- [ ] Client\n- [x] Vendor\n";
        let doc = EntityDoc::parse(content);
        assert_eq!(doc.references().count(), 0);
        assert_eq!(doc.render(), content);
    }
}
