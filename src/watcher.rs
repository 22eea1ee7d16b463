use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::SyncConfig;
use crate::error::Result;

/// Watches the notes directory and re-runs both synchronization passes once
/// writes have settled. Dropping it stops the background thread.
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
}

impl VaultWatcher {
    pub fn start(config: SyncConfig) -> Result<Self> {
        Self::start_with(config, |config| {
            crate::run_full_pass(config);
        })
    }

    /// Like [`VaultWatcher::start`] with a custom pass, called on the watcher thread.
    pub fn start_with<F>(config: SyncConfig, on_settled: F) -> Result<Self>
    where
        F: Fn(&SyncConfig) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            tx,
            Config::default().with_poll_interval(Duration::from_millis(300)),
        )?;
        watcher.watch(&config.notes_directory, RecursiveMode::Recursive)?;

        let debounce = Duration::from_millis(config.watcher.debounce_ms);
        log::info!(
            "[watcher] Watching {:?} (debounce {:?})",
            config.notes_directory,
            debounce
        );

        thread::spawn(move || {
            // Time of the latest relevant event not yet handled
            let mut pending: Option<Instant> = None;
            let tick = debounce.min(Duration::from_millis(250)).max(Duration::from_millis(10));

            loop {
                match rx.recv_timeout(tick) {
                    Ok(Ok(event)) => {
                        if is_relevant_event(&event, &config) {
                            log::debug!("[watcher] {:?} {:?}", event.kind, event.paths);
                            pending = Some(Instant::now());
                        }
                    }
                    Ok(Err(e)) => {
                        log::warn!("[watcher] File watcher error: {}", e);
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if let Some(last_event) = pending {
                            if last_event.elapsed() >= debounce {
                                pending = None;
                                log::info!("[watcher] Changes settled, synchronizing");
                                on_settled(&config);
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        break;
                    }
                }
            }
            log::debug!("[watcher] Stopped");
        });

        Ok(VaultWatcher { _watcher: watcher })
    }
}

/// Note edits plus folder create/remove/rename, since moving a folder of notes
/// only reports the folder itself.
pub(crate) fn is_relevant_event(event: &Event, config: &SyncConfig) -> bool {
    match event.kind {
        EventKind::Access(_) => false,
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => event
            .paths
            .iter()
            .any(|p| is_note_folder(p, config)),
        EventKind::Modify(ModifyKind::Name(_)) => event.paths.iter().any(|p| {
            should_process_path(p, config)
                || ((p.is_dir() || p.extension().is_none()) && is_note_folder(p, config))
        }),
        _ => event
            .paths
            .iter()
            .any(|p| should_process_path(p, config)),
    }
}

fn visible_dirs<'a>(mut dirs: impl Iterator<Item = Component<'a>>, config: &SyncConfig) -> bool {
    dirs.all(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            !name.starts_with('.') && !config.excluded_dirs.iter().any(|d| d.as_str() == name)
        }
        _ => true,
    })
}

/// Markdown files outside excluded and hidden directories.
///
/// Hidden directories cover the data folder, so store writes never retrigger.
pub(crate) fn should_process_path(path: &Path, config: &SyncConfig) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("md") {
        return false;
    }
    let relative = path.strip_prefix(&config.notes_directory).unwrap_or(path);
    // the file name itself may be hidden
    relative
        .parent()
        .map_or(true, |dirs| visible_dirs(dirs.components(), config))
}

/// A folder below the notes root that a scan would descend into.
fn is_note_folder(path: &Path, config: &SyncConfig) -> bool {
    match path.strip_prefix(&config.notes_directory) {
        Ok(relative) => {
            relative.components().next().is_some() && visible_dirs(relative.components(), config)
        }
        Err(_) => false,
    }
}
