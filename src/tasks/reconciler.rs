use chrono::{Days, NaiveDate};
use std::collections::{HashMap, HashSet};

use super::recurrence::next_occurrence;
use super::{instance_id, DoneRecord, Task};

/// Merge raw task declarations with the completion ledger into the open-task list.
///
/// Pure: the result depends only on the inputs, so callers replace the whole
/// persisted list with it on every pass.
///
/// - Non-recurring tasks stay open until a done record with the same id exists.
/// - Recurring tasks get exactly one open occurrence: the rule applied to the due
///   date of their latest completion (or to yesterday when never completed).
///   Nothing is emitted past `end_date` or when that occurrence is already done.
pub fn synchronize(raw: &[Task], ledger: &[DoneRecord], today: NaiveDate) -> Vec<Task> {
    let done_instance_ids: HashSet<&str> = ledger.iter().filter_map(DoneRecord::instance_id).collect();
    let done_plain_ids: HashSet<&str> = ledger
        .iter()
        .filter(|r| !r.is_recurring())
        .map(DoneRecord::id)
        .collect();

    let mut latest_completion: HashMap<&str, &DoneRecord> = HashMap::new();
    for record in ledger {
        latest_completion
            .entry(record.id())
            .and_modify(|current| {
                if record.completed_at() > current.completed_at() {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);

    raw.iter()
        .filter_map(|task| {
            let Some(rule) = &task.recurrence else {
                return (!done_plain_ids.contains(task.id.as_str())).then(|| task.clone());
            };

            let seed = latest_completion
                .get(task.id.as_str())
                .and_then(|record| record.task().due_date)
                .unwrap_or(yesterday);
            let occurrence = next_occurrence(rule, seed);

            if task.end_date.is_some_and(|end| occurrence > end) {
                log::debug!("[reconciler] {} ended before {}", task.id, occurrence);
                return None;
            }

            let instance = instance_id(&task.id, occurrence);
            if done_instance_ids.contains(instance.as_str()) {
                return None;
            }

            Some(Task {
                completed: false,
                completed_at: None,
                due_date: Some(occurrence),
                instance_id: Some(instance),
                ..task.clone()
            })
        })
        .collect()
}
