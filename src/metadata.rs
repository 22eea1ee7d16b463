use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::frontmatter::{parse_frontmatter, split_frontmatter_body, string_field, tags_field};
use crate::scanner::{NoteScanner, ScannedNote};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    Journal,
    #[default]
    Page,
}

/// Per-note metadata owned by the metadata collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(rename = "type", default)]
    pub note_type: NoteType,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NoteMetadata {
    /// Derive metadata from a note's frontmatter.
    ///
    /// Title falls back to the file stem, type to `journal` for files under
    /// `journals/`.
    pub fn from_note(note: &ScannedNote) -> Result<Self> {
        let (raw, _body) = split_frontmatter_body(&note.content);
        let frontmatter = match raw {
            Some(raw) => parse_frontmatter(&raw)?,
            None => Default::default(),
        };

        let stem = Path::new(&note.path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let title = string_field(&frontmatter, "title")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(stem);

        let note_type = match string_field(&frontmatter, "pageType").as_deref() {
            Some("journal") => NoteType::Journal,
            Some("page") => NoteType::Page,
            _ if note.path.starts_with("journals/") => NoteType::Journal,
            _ => NoteType::Page,
        };

        Ok(Self {
            path: note.path.clone(),
            title,
            date: string_field(&frontmatter, "date").unwrap_or_default(),
            note_type,
            tags: tags_field(&frontmatter),
        })
    }
}

/// Source of note metadata used for link resolution.
pub trait MetadataSource {
    fn notes(&self) -> Result<Vec<NoteMetadata>>;
}

/// Reads the collaborator's `pages.json` / `journals.json`, deriving metadata
/// from frontmatter when either file is missing or corrupt.
pub struct MetadataCache<'a> {
    config: &'a SyncConfig,
}

impl<'a> MetadataCache<'a> {
    pub fn new(config: &'a SyncConfig) -> Self {
        Self { config }
    }

    fn cache_path(&self, note_type: NoteType) -> PathBuf {
        let file = match note_type {
            NoteType::Journal => "journals.json",
            NoteType::Page => "pages.json",
        };
        self.config.data_dir().join(file)
    }

    fn read_cached(&self, note_type: NoteType) -> Result<Vec<NoteMetadata>> {
        let path = self.cache_path(note_type);
        let content = fs::read_to_string(&path).map_err(|e| SyncError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| SyncError::json(&path, e))
    }

    /// Metadata for every readable note with parseable frontmatter.
    pub fn derive_from_notes(&self) -> Vec<NoteMetadata> {
        NoteScanner::new(self.config)
            .scan()
            .iter()
            .filter_map(|note| match NoteMetadata::from_note(note) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    log::warn!("[metadata] Skipping {}: {}", note.path, e);
                    None
                }
            })
            .collect()
    }
}

impl MetadataSource for MetadataCache<'_> {
    fn notes(&self) -> Result<Vec<NoteMetadata>> {
        match (self.read_cached(NoteType::Page), self.read_cached(NoteType::Journal)) {
            (Ok(mut pages), Ok(journals)) => {
                pages.extend(journals);
                Ok(pages)
            }
            (Err(e), _) | (_, Err(e)) => {
                log::info!("[metadata] Metadata cache unavailable ({}), deriving from notes", e);
                Ok(self.derive_from_notes())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn note(path: &str, content: &str) -> ScannedNote {
        ScannedNote {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_from_frontmatter() {
        let meta = NoteMetadata::from_note(&note(
            "pages/note-b.md",
            "---\ntitle: Note B\ndate: 2024-03-05\ntags: [x]\n---\nbody",
        ))
        .unwrap();
        assert_eq!(meta.title, "Note B");
        assert_eq!(meta.date, "2024-03-05");
        assert_eq!(meta.note_type, NoteType::Page);
        assert_eq!(meta.tags, vec!["x"]);
    }

    #[test]
    fn test_title_falls_back_to_stem_and_journal_by_folder() {
        let meta = NoteMetadata::from_note(&note("journals/2024-03-05.md", "no frontmatter")).unwrap();
        assert_eq!(meta.title, "2024-03-05");
        assert_eq!(meta.note_type, NoteType::Journal);
    }

    #[test]
    fn test_page_type_from_frontmatter() {
        let meta =
            NoteMetadata::from_note(&note("misc/x.md", "---\ntitle: X\npageType: journal\n---\n"))
                .unwrap();
        assert_eq!(meta.note_type, NoteType::Journal);
    }

    #[test]
    fn test_cache_files_take_precedence() {
        let temp = TempDir::new().unwrap();
        let config = SyncConfig::for_notes_directory(temp.path());
        fs::create_dir_all(config.data_dir()).unwrap();
        fs::write(
            config.data_dir().join("pages.json"),
            r#"[{"path":"pages/a.md","title":"Cached A","date":"","type":"page","tags":[]}]"#,
        )
        .unwrap();
        fs::write(config.data_dir().join("journals.json"), "[]").unwrap();
        fs::create_dir_all(temp.path().join("pages")).unwrap();
        fs::write(temp.path().join("pages/a.md"), "---\ntitle: Disk A\n---\n").unwrap();

        let notes = MetadataCache::new(&config).notes().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Cached A");
    }

    #[test]
    fn test_corrupt_cache_falls_back_to_frontmatter() {
        let temp = TempDir::new().unwrap();
        let config = SyncConfig::for_notes_directory(temp.path());
        fs::create_dir_all(config.data_dir()).unwrap();
        fs::write(config.data_dir().join("pages.json"), "{ broken").unwrap();
        fs::create_dir_all(temp.path().join("pages")).unwrap();
        fs::write(temp.path().join("pages/a.md"), "---\ntitle: Disk A\n---\n").unwrap();
        fs::write(temp.path().join("pages/bad.md"), "---\ntitle: [oops\n---\n").unwrap();

        let notes = MetadataCache::new(&config).notes().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Disk A");
    }
}
