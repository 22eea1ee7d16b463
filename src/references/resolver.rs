use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::metadata::{NoteMetadata, NoteType};

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());

/// Outcome of resolving one wiki-link target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkTarget {
    Resolved(String),
    Unresolved(String),
}

/// Title and journal-date lookup built from note metadata.
#[derive(Debug, Default)]
pub struct LinkResolver {
    by_title: HashMap<String, String>,
    by_date: HashMap<String, String>,
}

impl LinkResolver {
    /// Notes are taken in path order and the first claim of a key wins, so the
    /// lookup does not depend on input order.
    pub fn from_notes(notes: &[NoteMetadata]) -> Self {
        let mut ordered: Vec<&NoteMetadata> = notes.iter().collect();
        ordered.sort_by(|a, b| a.path.cmp(&b.path));

        let mut resolver = Self::default();
        for note in ordered {
            let title = note.title.trim().to_lowercase();
            if !title.is_empty() {
                resolver.by_title.entry(title).or_insert_with(|| note.path.clone());
            }

            if note.note_type == NoteType::Journal {
                let date = ISO_DATE_RE
                    .find(&note.title)
                    .or_else(|| ISO_DATE_RE.find(&note.date))
                    .map(|m| m.as_str().to_string());
                if let Some(date) = date {
                    resolver.by_date.entry(date).or_insert_with(|| note.path.clone());
                }
            }
        }
        resolver
    }

    /// Resolve a link target by title (case-insensitive) or bare journal date.
    pub fn resolve(&self, name: &str) -> LinkTarget {
        let key = name.trim().to_lowercase();
        match self.by_title.get(&key).or_else(|| self.by_date.get(&key)) {
            Some(path) => LinkTarget::Resolved(path.clone()),
            None => LinkTarget::Unresolved(name.trim().to_string()),
        }
    }
}
