use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::resolver::{LinkResolver, LinkTarget};
use crate::error::Result;
use crate::frontmatter::split_frontmatter_body;
use crate::metadata::NoteMetadata;
use crate::scanner::NoteReader;

// Non-greedy so targets containing `]` still stop at the first `]]`
static WIKI_LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[(.+?)\]\]").unwrap());

/// Extract wiki-link targets (`[[...]]`) from text, in order of appearance.
pub fn extract_wiki_links(content: &str) -> Vec<String> {
    WIKI_LINK_RE
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Backlink graph: target note path -> distinct source note paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceIndex(BTreeMap<String, BTreeSet<String>>);

impl ReferenceIndex {
    pub fn insert(&mut self, target: &str, source: &str) {
        self.0
            .entry(target.to_string())
            .or_default()
            .insert(source.to_string());
    }

    /// Notes linking to `target`; empty when nothing does.
    pub fn backlinks(&self, target: &str) -> Vec<String> {
        self.0
            .get(target)
            .map(|sources| sources.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn targets(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolves every note's wiki-links into a [`ReferenceIndex`].
pub struct ReferenceIndexBuilder<'a> {
    notes: &'a [NoteMetadata],
    resolver: LinkResolver,
}

impl<'a> ReferenceIndexBuilder<'a> {
    pub fn new(notes: &'a [NoteMetadata]) -> Self {
        Self {
            notes,
            resolver: LinkResolver::from_notes(notes),
        }
    }

    /// All link targets in one note's body, frontmatter excluded.
    pub fn links(&self, note: &NoteMetadata, reader: &dyn NoteReader) -> Result<Vec<LinkTarget>> {
        let content = reader.read_note(&note.path)?;
        let (_frontmatter, body) = split_frontmatter_body(&content);
        Ok(extract_wiki_links(&body)
            .iter()
            .map(|name| self.resolver.resolve(name))
            .collect())
    }

    /// Links of every readable note. Unreadable notes are logged and skipped.
    fn all_links(&self, reader: &dyn NoteReader) -> Vec<(&'a str, Vec<LinkTarget>)> {
        let notes: &'a [NoteMetadata] = self.notes;
        notes
            .par_iter()
            .filter_map(|note| match self.links(note, reader) {
                Ok(links) => Some((note.path.as_str(), links)),
                Err(e) => {
                    log::warn!("[references] Skipping outgoing links of {}: {}", note.path, e);
                    None
                }
            })
            .collect()
    }

    /// Build the backlink index; unresolved targets contribute nothing.
    pub fn build(&self, reader: &dyn NoteReader) -> ReferenceIndex {
        let mut index = ReferenceIndex::default();
        for (source, links) in self.all_links(reader) {
            for link in links {
                if let LinkTarget::Resolved(target) = link {
                    index.insert(&target, source);
                }
            }
        }
        index
    }

    /// Unresolved link names per source note, for callers that create missing notes.
    pub fn unresolved(&self, reader: &dyn NoteReader) -> BTreeMap<String, BTreeSet<String>> {
        let mut missing: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (source, links) in self.all_links(reader) {
            for link in links {
                if let LinkTarget::Unresolved(name) = link {
                    missing.entry(source.to_string()).or_default().insert(name);
                }
            }
        }
        missing
    }
}
