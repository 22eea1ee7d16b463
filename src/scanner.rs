use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};

/// One markdown file read from the note tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedNote {
    /// Path relative to the notes directory, always '/'-separated
    pub path: String,
    pub content: String,
}

/// Reads note bodies by their relative path.
pub trait NoteReader: Sync {
    fn read_note(&self, relative_path: &str) -> Result<String>;
}

/// Walks the notes directory, skipping excluded directories.
pub struct NoteScanner {
    root: PathBuf,
    excluded_dirs: Vec<String>,
}

impl NoteScanner {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            root: config.notes_directory.clone(),
            excluded_dirs: config.excluded_dirs.clone(),
        }
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self
                .excluded_dirs
                .iter()
                .any(|d| entry.file_name().to_string_lossy() == d.as_str())
    }

    /// All `.md` files under the root, sorted for a stable pass order.
    pub fn markdown_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry))
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    log::warn!("[scanner] Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().and_then(|e| e.to_str()) == Some("md")
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }

    /// Relative, '/'-separated form of an absolute path under the root.
    pub fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Read every markdown file. Files that cannot be read are logged and skipped.
    pub fn scan(&self) -> Vec<ScannedNote> {
        let files = self.markdown_files();
        let notes: Vec<ScannedNote> = files
            .par_iter()
            .filter_map(|path| match fs::read_to_string(path) {
                Ok(content) => Some(ScannedNote {
                    path: self.relative_path(path),
                    content,
                }),
                Err(e) => {
                    log::warn!("[scanner] Skipping unreadable note {:?}: {}", path, e);
                    None
                }
            })
            .collect();
        log::debug!("[scanner] Scanned {} of {} markdown files", notes.len(), files.len());
        notes
    }
}

impl NoteReader for NoteScanner {
    fn read_note(&self, relative_path: &str) -> Result<String> {
        let path = self.root.join(relative_path);
        fs::read_to_string(&path).map_err(|e| SyncError::io(path, e))
    }
}
