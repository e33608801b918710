//! Small shared helpers: identifier normalization and atomic writes.

use std::io::Write;
use std::path::Path;

/// Normalize a display name to a stable document identifier.
///
/// Keeps word characters and hyphens, collapses whitespace runs to single
/// hyphens, drops everything else. Case-preserving:
/// "Sarah Chen" → "Sarah-Chen", "Acme / Corp." → "Acme-Corp".
pub fn normalize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            pending_hyphen = true;
        } else if c.is_alphanumeric() || c == '_' || c == '-' {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        }
    }
    out
}

/// Recover a display name from a document identifier.
///
/// Example: "Sarah-Chen" → "Sarah Chen"
pub fn display_name_from_id(id: &str) -> String {
    id.replace('-', " ")
}

/// Write `content` to `path` atomically: temp file in the same directory,
/// then rename over the target. Readers never observe a partial write.
pub fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_identifier("Sarah Chen"), "Sarah-Chen");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_identifier("Q2   Platform  Migration"), "Q2-Platform-Migration");
    }

    #[test]
    fn test_normalize_drops_punctuation() {
        assert_eq!(normalize_identifier("Acme / Corp."), "Acme-Corp");
        assert_eq!(normalize_identifier("Node.js"), "Nodejs");
    }

    #[test]
    fn test_normalize_preserves_hyphens() {
        assert_eq!(normalize_identifier("Bring-a-Trailer"), "Bring-a-Trailer");
    }

    #[test]
    fn test_normalize_trims_edges() {
        assert_eq!(normalize_identifier("  padded  "), "padded");
    }

    #[test]
    fn test_display_name_round_trip() {
        assert_eq!(display_name_from_id("Sarah-Chen"), "Sarah Chen");
    }

    #[test]
    fn test_atomic_write_creates_and_replaces() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("note.md");

        atomic_write_str(&path, "first").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

        atomic_write_str(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }
}
