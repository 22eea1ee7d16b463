pub mod config;
pub mod error;
pub mod frontmatter;
pub mod metadata;
pub mod references;
pub mod scanner;
pub mod tasks;
pub mod watcher;



use chrono::{Local, Utc};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use metadata::{MetadataCache, MetadataSource, NoteMetadata, NoteType};
pub use references::{LinkTarget, ReferenceIndex, ReferenceIndexBuilder, ReferenceIndexStore};
pub use scanner::{NoteReader, NoteScanner, ScannedNote};
pub use tasks::{DoneRecord, RecurrenceRule, Task, TaskStore};
pub use watcher::VaultWatcher;

/// Atomic file write: write to a temp file in the same directory, then rename,
/// so watchers and sync clients never observe a half-written store.
fn atomic_write_file(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let temp_path = path.with_file_name(format!("{}.mimirlink-tmp", file_name));

    let mut file = fs::File::create(&temp_path).map_err(|e| SyncError::io(&temp_path, e))?;
    file.write_all(content).map_err(|e| SyncError::io(&temp_path, e))?;
    file.sync_all().map_err(|e| SyncError::io(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| SyncError::io(path, e))?;

    Ok(())
}

pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| SyncError::json(path, e))?;
    atomic_write_file(path, json.as_bytes())
}

/// Read a JSON store. `Ok(None)` only when the file does not exist.
pub(crate) fn read_json_strict<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SyncError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| SyncError::json(path, e))
}

/// Read a derived store. Missing or corrupt files are treated as absent.
pub(crate) fn read_json_store<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match read_json_strict(path) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("[store] Treating store as absent: {}", e);
            None
        }
    }
}

/// Rebuild the open-task list from the note tree and the completion ledger,
/// replacing `tasks.json`.
pub fn synchronize_tasks(config: &SyncConfig) -> Result<Vec<Task>> {
    let today = Local::now().date_naive();
    let now = Utc::now();
    let store = TaskStore::new(config);
    let ledger = store.read_done();

    let notes = NoteScanner::new(config).scan();
    let raw: Vec<Task> = notes
        .par_iter()
        .flat_map_iter(|note| tasks::extract_tasks(&note.content, &note.path, today, now))
        .collect();

    let open = tasks::synchronize(&raw, &ledger, today);
    store.write_open(&open)?;

    log::info!(
        "[sync_tasks] Synchronized {} open tasks from {} declarations in {} notes",
        open.len(),
        raw.len(),
        notes.len()
    );
    Ok(open)
}

/// Record a task (or one occurrence of a recurring task) as done.
pub fn complete_task(config: &SyncConfig, task: Task) -> Result<DoneRecord> {
    TaskStore::new(config).complete(task, Utc::now())
}

/// Open tasks as last persisted; rebuilt when `tasks.json` is missing or corrupt.
pub fn read_open_tasks(config: &SyncConfig) -> Result<Vec<Task>> {
    match TaskStore::new(config).try_read_open() {
        Some(open) => Ok(open),
        None => synchronize_tasks(config),
    }
}

pub fn read_done_tasks(config: &SyncConfig) -> Vec<DoneRecord> {
    TaskStore::new(config).read_done()
}

/// Rebuild the backlink index from scratch and persist it as `references.json`.
pub fn build_reference_index(config: &SyncConfig) -> Result<ReferenceIndex> {
    let notes = MetadataCache::new(config).notes()?;
    let scanner = NoteScanner::new(config);
    let index = ReferenceIndexBuilder::new(&notes).build(&scanner);
    ReferenceIndexStore::new(config).write(&index)?;

    log::info!(
        "[references] Indexed backlinks for {} targets across {} notes",
        index.len(),
        notes.len()
    );
    Ok(index)
}

/// The persisted backlink index; rebuilt when missing or corrupt.
pub fn read_reference_index(config: &SyncConfig) -> Result<ReferenceIndex> {
    match ReferenceIndexStore::new(config).read() {
        Some(index) => Ok(index),
        None => build_reference_index(config),
    }
}

/// Link names that match no note, per source path. Creating the missing notes
/// is left to the caller, which then rebuilds the index.
pub fn unresolved_links(config: &SyncConfig) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let notes = MetadataCache::new(config).notes()?;
    let scanner = NoteScanner::new(config);
    Ok(ReferenceIndexBuilder::new(&notes).unresolved(&scanner))
}

/// Run both passes. A failing pass is logged and does not stop the other.
pub fn run_full_pass(config: &SyncConfig) {
    if let Err(e) = synchronize_tasks(config) {
        log::error!("[sync] Task synchronization failed: {}", e);
    }
    if let Err(e) = build_reference_index(config) {
        log::error!("[sync] Reference indexing failed: {}", e);
    }
}

/// Startup pass followed by watch mode; blocks for the life of the process.
pub fn run(config: SyncConfig) -> Result<()> {
    if !config.notes_directory.exists() {
        log::info!("[sync] Creating notes directory: {:?}", config.notes_directory);
        fs::create_dir_all(&config.notes_directory)
            .map_err(|e| SyncError::io(&config.notes_directory, e))?;
    }

    log::info!("[sync] Performing initial synchronization");
    run_full_pass(&config);

    if !config.watcher.enabled {
        return Ok(());
    }

    let _watcher = VaultWatcher::start(config)?;
    loop {
        std::thread::park();
    }
}
