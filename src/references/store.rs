use std::path::PathBuf;

use super::builder::ReferenceIndex;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::{read_json_store, write_json_atomic};

/// Persists the backlink map as `references.json`.
pub struct ReferenceIndexStore {
    path: PathBuf,
}

impl ReferenceIndexStore {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            path: config.references_path(),
        }
    }

    /// `None` when the file is missing or corrupt.
    pub fn read(&self) -> Option<ReferenceIndex> {
        read_json_store(&self.path)
    }

    pub fn write(&self, index: &ReferenceIndex) -> Result<()> {
        write_json_atomic(&self.path, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let store = ReferenceIndexStore::new(&SyncConfig::for_notes_directory(temp.path()));
        assert!(store.read().is_none());

        let mut index = ReferenceIndex::default();
        index.insert("pages/b.md", "pages/a.md");
        store.write(&index).unwrap();

        assert_eq!(store.read(), Some(index));
    }

    #[test]
    fn test_corrupt_file_reads_as_absent() {
        let temp = TempDir::new().unwrap();
        let config = SyncConfig::for_notes_directory(temp.path());
        fs::create_dir_all(config.data_dir()).unwrap();
        fs::write(config.references_path(), "{\"pages/b.md\": 42").unwrap();

        assert!(ReferenceIndexStore::new(&config).read().is_none());
    }

    #[test]
    fn test_accepts_legacy_array_order() {
        let temp = TempDir::new().unwrap();
        let config = SyncConfig::for_notes_directory(temp.path());
        fs::create_dir_all(config.data_dir()).unwrap();
        fs::write(
            config.references_path(),
            r#"{ "pages/b.md": ["pages/z.md", "pages/a.md", "pages/z.md"] }"#,
        )
        .unwrap();

        let index = ReferenceIndexStore::new(&config).read().unwrap();
        assert_eq!(index.backlinks("pages/b.md"), vec!["pages/a.md", "pages/z.md"]);
    }
}
