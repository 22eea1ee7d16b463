//! Turns note text into typed task tokens before any scheduling happens.
//!
//! A task line is a checkbox list item (`- [ ]` / `- [x]`). Annotations
//! `due:`, `planned:`, `recurring:` and `end:` are lifted out of the text; dates
//! may be wrapped in link brackets (`due:[[2024-01-05]]`). Annotation text that
//! does not parse stays in the description.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::recurrence::RecurrenceRule;
use super::Task;

static TASK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-\s*\[([ xX])\]\s*(.*)$").unwrap());
static DUE_RE: Lazy<Regex> = Lazy::new(|| date_annotation("due"));
static PLANNED_RE: Lazy<Regex> = Lazy::new(|| date_annotation("planned"));
static END_RE: Lazy<Regex> = Lazy::new(|| date_annotation("end"));
static RECURRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"recurring:(\w+|\[[\w,\s]+\])").unwrap());

fn date_annotation(key: &str) -> Regex {
    Regex::new(&format!(r"{}:(?:\[\[?)?(\d{{4}}-\d{{2}}-\d{{2}})(?:\]\]?)?", key)).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Due(NaiveDate),
    Planned(NaiveDate),
    Recurring(RecurrenceRule),
    End(NaiveDate),
}

/// One recognised checkbox line.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskLine {
    pub checked: bool,
    /// Remaining text with captured annotations removed
    pub text: String,
    pub annotations: Vec<Annotation>,
}

impl TaskLine {
    fn date_of(&self, pick: fn(&Annotation) -> Option<NaiveDate>) -> Option<NaiveDate> {
        self.annotations.iter().find_map(pick)
    }

    pub fn due(&self) -> Option<NaiveDate> {
        self.date_of(|a| match a {
            Annotation::Due(d) => Some(*d),
            _ => None,
        })
    }

    pub fn planned(&self) -> Option<NaiveDate> {
        self.date_of(|a| match a {
            Annotation::Planned(d) => Some(*d),
            _ => None,
        })
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.date_of(|a| match a {
            Annotation::End(d) => Some(*d),
            _ => None,
        })
    }

    pub fn recurrence(&self) -> Option<&RecurrenceRule> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::Recurring(rule) => Some(rule),
            _ => None,
        })
    }
}

/// Remove the first match of `re` whose capture `parse` accepts; rejected
/// matches stay in `text`.
fn take_annotation<T>(
    text: &mut String,
    re: &Regex,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let (range, value) = re.captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        let value = parse(caps.get(1)?.as_str())?;
        Some((whole.range(), value))
    })?;
    let before = text[..range.start].trim_end();
    let after = text[range.end..].trim_start();
    *text = format!("{} {}", before, after).trim().to_string();
    Some(value)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Tokenize one line; `None` when it is not a task.
pub fn tokenize_line(line: &str) -> Option<TaskLine> {
    let caps = TASK_RE.captures(line)?;
    let checked = !caps[1].trim().is_empty();
    let mut text = caps[2].trim_end_matches('\r').to_string();
    let mut annotations = Vec::new();

    if let Some(d) = take_annotation(&mut text, &DUE_RE, parse_date) {
        annotations.push(Annotation::Due(d));
    }
    if let Some(d) = take_annotation(&mut text, &PLANNED_RE, parse_date) {
        annotations.push(Annotation::Planned(d));
    }
    if let Some(rule) = take_annotation(&mut text, &RECURRING_RE, |s| Some(RecurrenceRule::parse(s))) {
        annotations.push(Annotation::Recurring(rule));
    }
    if let Some(d) = take_annotation(&mut text, &END_RE, parse_date) {
        annotations.push(Annotation::End(d));
    }

    Some(TaskLine {
        checked,
        text: text.trim().to_string(),
        annotations,
    })
}

/// Raw task declarations of one file, in line order.
///
/// Plain tasks without an explicit due date are due `today`; recurring tasks
/// keep whatever due date they declare and get their occurrence later.
pub fn extract_tasks(content: &str, file_path: &str, today: NaiveDate, now: DateTime<Utc>) -> Vec<Task> {
    content
        .split('\n')
        .enumerate()
        .filter_map(|(index, line)| {
            let token = tokenize_line(line)?;
            let recurrence = token.recurrence().cloned();
            let due_date = match (token.due(), &recurrence) {
                (Some(d), _) => Some(d),
                (None, Some(_)) => None,
                (None, None) => Some(today),
            };
            Some(Task {
                id: format!("{}-{}", file_path, index),
                description: token.text.clone(),
                completed: false,
                file_path: file_path.to_string(),
                line_number: index + 1,
                due_date,
                planned_date: token.planned(),
                end_date: token.end(),
                recurrence,
                created_at: now,
                completed_at: None,
                instance_id: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_non_task_lines_are_ignored() {
        assert!(tokenize_line("# Heading").is_none());
        assert!(tokenize_line("- plain bullet").is_none());
        assert!(tokenize_line("text - [ ] not at line start").is_none());
        assert!(tokenize_line("- [?] odd box").is_none());
    }

    #[test]
    fn test_checkbox_states() {
        assert!(!tokenize_line("- [ ] open").unwrap().checked);
        assert!(tokenize_line("- [x] done").unwrap().checked);
        assert!(tokenize_line("  - [X] indented").unwrap().checked);
    }

    #[test]
    fn test_annotations_are_stripped() {
        let line = tokenize_line(
            "- [ ] Pay rent due:[[2024-02-01]] planned:2024-01-30 recurring:monthly end:2024-12-31",
        )
        .unwrap();
        assert_eq!(line.text, "Pay rent");
        assert_eq!(line.due(), Some(date("2024-02-01")));
        assert_eq!(line.planned(), Some(date("2024-01-30")));
        assert_eq!(line.end(), Some(date("2024-12-31")));
        assert_eq!(line.recurrence(), Some(&RecurrenceRule::Monthly));
    }

    #[test]
    fn test_weekday_recurrence() {
        let line = tokenize_line("- [ ] Gym recurring:[mon, wed,fri]").unwrap();
        assert_eq!(line.text, "Gym");
        assert_eq!(line.recurrence(), Some(&RecurrenceRule::parse("[mon,wed,fri]")));
    }

    #[test]
    fn test_malformed_annotation_stays_in_description() {
        let line = tokenize_line("- [ ] Call bob due:2024-13-45 due:tomorrow").unwrap();
        assert_eq!(line.text, "Call bob due:2024-13-45 due:tomorrow");
        assert!(line.due().is_none());
    }

    #[test]
    fn test_valid_annotation_after_malformed_one() {
        let line = tokenize_line("- [ ] x due:2024-13-45 due:2024-01-05").unwrap();
        assert_eq!(line.due(), Some(date("2024-01-05")));
        assert_eq!(line.text, "x due:2024-13-45");

        let tasks = extract_tasks("- [ ] x due:2024-13-45 due:2024-01-05", "a.md", date("2024-01-10"), now());
        assert_eq!(tasks[0].due_date, Some(date("2024-01-05")));
    }

    #[test]
    fn test_extract_assigns_ids_and_default_due() {
        let content = "# Todo\n- [ ] First\ntext\n- [ ] Second due:2024-03-01\n- [ ] Water plants recurring:daily";
        let tasks = extract_tasks(content, "pages/todo.md", date("2024-01-10"), now());

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].id, "pages/todo.md-1");
        assert_eq!(tasks[0].line_number, 2);
        assert_eq!(tasks[0].due_date, Some(date("2024-01-10")));
        assert_eq!(tasks[1].id, "pages/todo.md-3");
        assert_eq!(tasks[1].due_date, Some(date("2024-03-01")));
        assert_eq!(tasks[2].description, "Water plants");
        assert_eq!(tasks[2].due_date, None, "recurring tasks get their date from the reconciler");
        assert!(tasks.iter().all(|t| !t.completed && t.created_at == now()));
    }

    #[test]
    fn test_crlf_line_endings() {
        let tasks = extract_tasks("- [ ] One\r\n- [ ] Two\r\n", "a.md", date("2024-01-10"), now());
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].description, "One");
        assert_eq!(tasks[1].description, "Two");
    }
}
