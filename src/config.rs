//! Layered workspace configuration.
//!
//! Built once at process start and handed to every entry point. Layers, later
//! ones winning per key:
//! - built-in defaults
//! - `~/.mimirlink/mimirlink.config.json`
//! - the nearest `mimirlink.config.json` in the working directory or its ancestors
//! - `MIMIRLINK_WORKSPACE` / `MIMIRLINK_NOTES_DIRECTORY`

use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SyncError};

pub const CONFIG_FILE_NAME: &str = "mimirlink.config.json";
pub const DEFAULT_DATA_DIR: &str = ".mimirlink";

const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub enabled: bool,
    /// Quiet period after the last relevant event before a pass runs
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub workspace: PathBuf,
    pub notes_directory: PathBuf,
    /// Folder inside `notes_directory` holding the derived stores
    pub data_dir_name: String,
    /// Directory names pruned from every scan
    pub excluded_dirs: Vec<String>,
    pub watcher: WatcherConfig,
}

impl SyncConfig {
    /// Configuration rooted at an explicit notes directory, everything else default.
    pub fn for_notes_directory(notes_directory: impl Into<PathBuf>) -> Self {
        let notes_directory = notes_directory.into();
        Self {
            workspace: notes_directory.clone(),
            notes_directory,
            data_dir_name: DEFAULT_DATA_DIR.to_string(),
            excluded_dirs: vec![DEFAULT_DATA_DIR.to_string(), "assets".to_string()],
            watcher: WatcherConfig::default(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.notes_directory.join(&self.data_dir_name)
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir().join("tasks.json")
    }

    pub fn done_tasks_path(&self) -> PathBuf {
        self.data_dir().join("done_tasks.json")
    }

    pub fn references_path(&self) -> PathBuf {
        self.data_dir().join("references.json")
    }

    /// The data folder must be a single directory name inside the notes directory.
    pub fn validate(&self) -> Result<()> {
        let mut parts = Path::new(&self.data_dir_name).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(SyncError::Config(format!(
                "dataDirName must be a single folder name, got {:?}",
                self.data_dir_name
            ))),
        }
    }

    /// Load from the real process environment.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| SyncError::io(".", e))?;
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let config = ConfigLoader {
            cwd,
            home,
            env: |key: &str| std::env::var(key).ok(),
        }
        .load();
        config.validate()?;
        log::info!("[config] Resolved workspace: {:?}", config.workspace);
        log::info!("[config] Resolved notes directory: {:?}", config.notes_directory);
        Ok(config)
    }
}

/// One configuration file layer; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    workspace: Option<PathBuf>,
    notes_directory: Option<PathBuf>,
    data_dir_name: Option<String>,
    excluded_dirs: Option<Vec<String>>,
    watcher: Option<WatcherFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatcherFile {
    enabled: Option<bool>,
    debounce_ms: Option<u64>,
}

/// Resolves a [`SyncConfig`] from explicit inputs so the layering is testable.
pub struct ConfigLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub cwd: PathBuf,
    pub home: Option<PathBuf>,
    pub env: F,
}

impl<F> ConfigLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn load(&self) -> SyncConfig {
        let mut config = SyncConfig {
            workspace: self.cwd.clone(),
            notes_directory: PathBuf::from("docs").join("samples"),
            ..SyncConfig::for_notes_directory(&self.cwd)
        };

        if let Some(home) = &self.home {
            let user_path = home.join(DEFAULT_DATA_DIR).join(CONFIG_FILE_NAME);
            if let Some(layer) = read_layer(&user_path) {
                apply_layer(&mut config, layer);
            }
        }

        if let Some((dir, layer)) = find_project_layer(&self.cwd) {
            apply_layer(&mut config, layer);
            config.workspace = dir;
        }

        if let Some(workspace) = (self.env)("MIMIRLINK_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(notes) = (self.env)("MIMIRLINK_NOTES_DIRECTORY") {
            config.notes_directory = PathBuf::from(notes);
        }

        if config.notes_directory.is_relative() {
            config.notes_directory = config.workspace.join(&config.notes_directory);
        }

        config
    }
}

fn apply_layer(config: &mut SyncConfig, layer: ConfigFile) {
    if let Some(workspace) = layer.workspace {
        config.workspace = workspace;
    }
    if let Some(notes) = layer.notes_directory {
        config.notes_directory = notes;
    }
    if let Some(name) = layer.data_dir_name {
        config.data_dir_name = name;
    }
    if let Some(excluded) = layer.excluded_dirs {
        config.excluded_dirs = excluded;
    }
    if let Some(watcher) = layer.watcher {
        if let Some(enabled) = watcher.enabled {
            config.watcher.enabled = enabled;
        }
        if let Some(ms) = watcher.debounce_ms {
            config.watcher.debounce_ms = ms;
        }
    }
}

/// A layer that fails to read or parse is logged and treated as absent.
fn read_layer(path: &Path) -> Option<ConfigFile> {
    if !path.is_file() {
        return None;
    }
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("[config] Failed to read {:?}: {}", path, e);
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(layer) => Some(layer),
        Err(e) => {
            log::warn!("[config] Ignoring unparseable config {:?}: {}", path, e);
            None
        }
    }
}

fn find_project_layer(cwd: &Path) -> Option<(PathBuf, ConfigFile)> {
    cwd.ancestors().find_map(|dir| {
        read_layer(&dir.join(CONFIG_FILE_NAME)).map(|layer| (dir.to_path_buf(), layer))
    })
}
