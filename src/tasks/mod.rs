pub mod reconciler;
pub mod recurrence;
pub mod store;
pub mod tokenizer;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use reconciler::synchronize;
pub use recurrence::{next_occurrence, RecurrenceRule};
pub use store::TaskStore;
pub use tokenizer::extract_tasks;

/// A task declared by a checkbox line in a note.
///
/// Non-recurring tasks are identified by `"<filePath>-<lineIndex>"`. Recurring
/// tasks share that base id across all occurrences; each occurrence carries its
/// own `instance_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub file_path: String,
    pub line_number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}

/// Identity of one occurrence of a recurring task.
pub fn instance_id(base_id: &str, occurrence: NaiveDate) -> String {
    format!("{}-{}", base_id, occurrence.format("%Y-%m-%d"))
}

/// Immutable snapshot of a task taken when it was completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DoneRecord(Task);

impl DoneRecord {
    pub fn new(task: Task, completed_at: DateTime<Utc>) -> Self {
        Self(Task {
            completed: true,
            completed_at: Some(completed_at),
            ..task
        })
    }

    pub fn task(&self) -> &Task {
        &self.0
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.0.instance_id.as_deref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.0.completed_at
    }

    pub fn is_recurring(&self) -> bool {
        self.0.is_recurring()
    }
}
