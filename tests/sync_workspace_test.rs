use mimirlink_lib::{
    complete_task, read_done_tasks, read_open_tasks, run_full_pass, synchronize_tasks, SyncConfig, Task,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_note(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn setup_vault() -> (TempDir, SyncConfig) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    write_note(
        temp.path(),
        "pages/todo.md",
        "# Todo\n- [ ] Buy milk\n- [ ] File taxes due:2030-04-15\n- [ ] Stretch recurring:daily",
    );
    write_note(temp.path(), "pages/notes.md", "No tasks here, see [[Todo]].");
    write_note(temp.path(), "assets/template.md", "- [ ] Template task");
    let config = SyncConfig::for_notes_directory(temp.path());
    (temp, config)
}

fn find<'a>(tasks: &'a [Task], description: &str) -> &'a Task {
    tasks
        .iter()
        .find(|t| t.description == description)
        .unwrap_or_else(|| panic!("no task {:?}", description))
}

#[test]
fn test_synchronize_writes_open_tasks() {
    let (_temp, config) = setup_vault();
    let open = synchronize_tasks(&config).unwrap();

    assert_eq!(open.len(), 3, "assets/ is excluded");
    assert_eq!(find(&open, "Buy milk").id, "pages/todo.md-1");
    assert!(find(&open, "Stretch").instance_id.is_some());

    let raw = fs::read_to_string(config.tasks_path()).unwrap();
    let persisted: Vec<Task> = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted, open);
}

#[test]
fn test_completed_task_disappears_after_resync() {
    let (_temp, config) = setup_vault();
    let open = synchronize_tasks(&config).unwrap();

    let milk = find(&open, "Buy milk").clone();
    let record = complete_task(&config, milk).unwrap();
    assert!(record.task().completed);
    assert!(record.completed_at().is_some());

    let open = synchronize_tasks(&config).unwrap();
    assert_eq!(open.len(), 2);
    assert!(open.iter().all(|t| t.description != "Buy milk"));
    assert_eq!(read_done_tasks(&config).len(), 1);
}

#[test]
fn test_completed_recurring_task_moves_forward() {
    let (_temp, config) = setup_vault();
    let open = synchronize_tasks(&config).unwrap();
    let stretch = find(&open, "Stretch").clone();
    let first_due = stretch.due_date.unwrap();

    complete_task(&config, stretch).unwrap();
    let open = synchronize_tasks(&config).unwrap();
    let next = find(&open, "Stretch");
    assert_eq!(next.due_date, first_due.succ_opt());
}

#[test]
fn test_damaged_ledger_keeps_earlier_completions() {
    let temp = TempDir::new().unwrap();
    write_note(temp.path(), "pages/todo.md", "- [ ] A\n- [ ] B\n- [ ] C");
    let config = SyncConfig::for_notes_directory(temp.path());

    let open = synchronize_tasks(&config).unwrap();
    complete_task(&config, find(&open, "A").clone()).unwrap();
    complete_task(&config, find(&open, "B").clone()).unwrap();

    let ledger = fs::read_to_string(config.done_tasks_path()).unwrap();
    let damaged = ledger.replacen("\"lineNumber\": 1", "\"lineNumber\": \"1\"", 1);
    assert_ne!(ledger, damaged);
    fs::write(config.done_tasks_path(), &damaged).unwrap();

    assert!(complete_task(&config, find(&open, "C").clone()).is_err());

    // repair the file by hand; nothing was lost
    fs::write(config.done_tasks_path(), &ledger).unwrap();
    assert_eq!(read_done_tasks(&config).len(), 2);
    let open = synchronize_tasks(&config).unwrap();
    let open: Vec<&str> = open.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(open, vec!["C"]);
}

#[test]
fn test_read_open_tasks_rebuilds_corrupt_store() {
    let (_temp, config) = setup_vault();
    fs::create_dir_all(config.data_dir()).unwrap();
    fs::write(config.tasks_path(), "[{ broken").unwrap();

    let open = read_open_tasks(&config).unwrap();
    assert_eq!(open.len(), 3);
    assert!(serde_json::from_str::<Vec<Task>>(&fs::read_to_string(config.tasks_path()).unwrap()).is_ok());
}

#[test]
fn test_full_pass_produces_both_stores() {
    let (_temp, config) = setup_vault();
    run_full_pass(&config);

    assert!(config.tasks_path().exists());
    assert!(config.references_path().exists());
    let references: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.references_path()).unwrap()).unwrap();
    assert_eq!(references["pages/todo.md"], serde_json::json!(["pages/notes.md"]));
}

#[test]
fn test_empty_vault() {
    let temp = TempDir::new().unwrap();
    let config = SyncConfig::for_notes_directory(temp.path());
    assert!(synchronize_tasks(&config).unwrap().is_empty());
    assert!(read_done_tasks(&config).is_empty());
}
