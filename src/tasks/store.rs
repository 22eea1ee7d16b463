use chrono::{DateTime, Utc};
use std::path::PathBuf;

use super::{DoneRecord, Task};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::{read_json_store, read_json_strict, write_json_atomic};

/// Persists the open-task list (`tasks.json`) and the completion ledger
/// (`done_tasks.json`).
pub struct TaskStore {
    tasks_path: PathBuf,
    done_path: PathBuf,
}

impl TaskStore {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            tasks_path: config.tasks_path(),
            done_path: config.done_tasks_path(),
        }
    }

    /// `None` when the file is missing or corrupt.
    pub fn try_read_open(&self) -> Option<Vec<Task>> {
        read_json_store(&self.tasks_path)
    }

    pub fn read_open(&self) -> Vec<Task> {
        self.try_read_open().unwrap_or_default()
    }

    pub fn write_open(&self, tasks: &[Task]) -> Result<()> {
        write_json_atomic(&self.tasks_path, tasks)
    }

    /// Lenient ledger read for scheduling passes: missing or corrupt reads as empty.
    pub fn read_done(&self) -> Vec<DoneRecord> {
        read_json_store(&self.done_path).unwrap_or_default()
    }

    /// Ledger read that fails on an unreadable or corrupt file instead of
    /// returning an empty list. Missing is still empty.
    pub fn try_read_done(&self) -> Result<Vec<DoneRecord>> {
        Ok(read_json_strict(&self.done_path)?.unwrap_or_default())
    }

    pub fn write_done(&self, records: &[DoneRecord]) -> Result<()> {
        write_json_atomic(&self.done_path, records)
    }

    /// Append a completion to the ledger.
    ///
    /// A recurring task keeps a single completion: earlier records sharing its
    /// base id are dropped first. A ledger that cannot be parsed is left
    /// untouched and the error is returned.
    pub fn complete(&self, task: Task, now: DateTime<Utc>) -> Result<DoneRecord> {
        let record = DoneRecord::new(task, now);
        let mut ledger = self.try_read_done().map_err(|e| {
            log::error!("[task_store] Refusing to rewrite ledger: {}", e);
            e
        })?;

        if record.is_recurring() {
            let before = ledger.len();
            ledger.retain(|r| r.id() != record.id());
            if ledger.len() != before {
                log::debug!("[task_store] Replaced prior completion of {}", record.id());
            }
        }

        ledger.push(record.clone());
        self.write_done(&ledger)?;
        log::info!("[task_store] Completed {}", record.instance_id().unwrap_or(record.id()));
        Ok(record)
    }
}
