//! Vault document storage.
//!
//! One markdown file per document: `<root>/<folder>/<identifier>.md`.
//! Writes are atomic (temp file + rename) and create the category folder
//! on demand. I/O failures surface as `VaultError::Storage` and are not
//! retried here; retry policy belongs to callers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::VaultError;
use crate::types::Category;
use crate::util::atomic_write_str;

const DOC_EXT: &str = "md";

/// Read/write access to the vault directory tree.
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
}

impl VaultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        VaultStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a document, whether or not it exists.
    pub fn document_path(&self, category: Category, id: &str) -> PathBuf {
        self.root
            .join(category.folder())
            .join(format!("{}.{}", id, DOC_EXT))
    }

    fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.folder())
    }

    /// Create every category folder up front.
    pub fn ensure_layout(&self) -> Result<(), VaultError> {
        for category in Category::ALL {
            let dir = self.category_dir(category);
            fs::create_dir_all(&dir).map_err(|e| VaultError::storage(&dir, e))?;
        }
        log::debug!("vault layout ensured at {}", self.root.display());
        Ok(())
    }

    pub fn exists(&self, category: Category, id: &str) -> bool {
        self.document_path(category, id).is_file()
    }

    /// Read a document's full content. Content that isn't valid UTF-8 is
    /// a `Parse` error (the analyzer skips it), not a storage failure.
    pub fn read(&self, category: Category, id: &str) -> Result<String, VaultError> {
        let path = self.document_path(category, id);
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => VaultError::NotFound {
                category,
                id: id.to_string(),
            },
            io::ErrorKind::InvalidData => VaultError::Parse {
                path,
                reason: "content is not valid UTF-8".to_string(),
            },
            _ => VaultError::storage(path, e),
        })
    }

    /// Write a document, creating the category folder if absent.
    pub fn write(&self, category: Category, id: &str, content: &str) -> Result<(), VaultError> {
        let dir = self.category_dir(category);
        fs::create_dir_all(&dir).map_err(|e| VaultError::storage(&dir, e))?;

        let path = self.document_path(category, id);
        atomic_write_str(&path, content).map_err(|e| VaultError::storage(path, e))
    }

    /// Last-modified timestamp of a document.
    pub fn modified_time(&self, category: Category, id: &str) -> Result<SystemTime, VaultError> {
        let path = self.document_path(category, id);
        let metadata = fs::metadata(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                VaultError::NotFound {
                    category,
                    id: id.to_string(),
                }
            } else {
                VaultError::storage(path.clone(), e)
            }
        })?;
        metadata
            .modified()
            .map_err(|e| VaultError::storage(path, e))
    }

    /// Lazily list document identifiers in a category.
    ///
    /// One pass over the current directory state; files added during the
    /// listing may or may not appear. A missing category folder is an
    /// empty listing, not an error.
    pub fn list(&self, category: Category) -> Result<DocumentIds, VaultError> {
        let dir = self.category_dir(category);
        match fs::read_dir(&dir) {
            Ok(entries) => Ok(DocumentIds {
                inner: Some(entries),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DocumentIds { inner: None }),
            Err(e) => Err(VaultError::storage(dir, e)),
        }
    }

    /// Document count for a category. Listing failures count as zero.
    pub fn count(&self, category: Category) -> usize {
        match self.list(category) {
            Ok(ids) => ids.count(),
            Err(e) => {
                log::warn!("count of {} failed: {}", category, e);
                0
            }
        }
    }
}

/// Lazy iterator over the document identifiers of one category.
pub struct DocumentIds {
    inner: Option<fs::ReadDir>,
}

impl Iterator for DocumentIds {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let entries = self.inner.as_mut()?;
        for entry in entries.by_ref() {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(DOC_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                return Some(stem.to_string());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, VaultStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = VaultStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, store) = store();
        store
            .write(Category::Person, "Sarah-Chen", "# Sarah Chen\n")
            .unwrap();
        let content = store.read(Category::Person, "Sarah-Chen").unwrap();
        assert_eq!(content, "# Sarah Chen\n");
        assert!(store.exists(Category::Person, "Sarah-Chen"));
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, store) = store();
        let err = store.read(Category::Company, "Nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_write_creates_category_folder() {
        let (_dir, store) = store();
        assert!(!store.root().join("Tasks").exists());
        store.write(Category::Task, "TASK-1", "content").unwrap();
        assert!(store.root().join("Tasks").is_dir());
    }

    #[test]
    fn test_list_skips_non_documents() {
        let (_dir, store) = store();
        store.write(Category::Meeting, "2026-02-17-sync", "notes").unwrap();
        store.write(Category::Meeting, "2026-02-18-sync", "notes").unwrap();
        std::fs::write(store.root().join("Meetings").join("scratch.txt"), "x").unwrap();

        let mut ids: Vec<String> = store.list(Category::Meeting).unwrap().collect();
        ids.sort();
        assert_eq!(ids, vec!["2026-02-17-sync", "2026-02-18-sync"]);
    }

    #[test]
    fn test_list_missing_folder_is_empty() {
        let (_dir, store) = store();
        assert_eq!(store.list(Category::Technology).unwrap().count(), 0);
    }

    #[test]
    fn test_ensure_layout_creates_all_folders() {
        let (_dir, store) = store();
        store.ensure_layout().unwrap();
        for category in Category::ALL {
            assert!(store.root().join(category.folder()).is_dir());
        }
    }

    #[test]
    fn test_count() {
        let (_dir, store) = store();
        store.write(Category::Company, "Acme", "a").unwrap();
        store.write(Category::Company, "Initech", "b").unwrap();
        assert_eq!(store.count(Category::Company), 2);
        assert_eq!(store.count(Category::Person), 0);
    }

    #[test]
    fn test_modified_time_changes_on_write() {
        let (_dir, store) = store();
        store.write(Category::Person, "A", "one").unwrap();
        let first = store.modified_time(Category::Person, "A").unwrap();

        // Force a distinct mtime rather than racing the filesystem clock
        let path = store.document_path(Category::Person, "A");
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_700_000_000, 0))
            .unwrap();
        let second = store.modified_time(Category::Person, "A").unwrap();
        assert_ne!(first, second);
    }
}
