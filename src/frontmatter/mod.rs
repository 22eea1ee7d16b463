use std::collections::HashMap;

use crate::error::{Result, SyncError};

/// Split markdown content into raw frontmatter and body.
///
/// Frontmatter opens with a line that is exactly `---` and closes at the next
/// line starting with `---`. A longer rule such as `----`, or a missing closing
/// fence, leaves the whole file as body.
pub fn split_frontmatter_body(content: &str) -> (Option<String>, String) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content.to_string());
    };

    let (raw, after) = if let Some(after) = rest.strip_prefix("---") {
        ("", after)
    } else if let Some(end) = rest.find("\n---") {
        (&rest[..end], &rest[end + 4..])
    } else {
        return (None, content.to_string());
    };

    let body = after.trim_start_matches(['\r', '\n']).to_string();
    (Some(raw.trim().to_string()), body)
}

/// Parse a raw YAML frontmatter block into a key/value map.
pub fn parse_frontmatter(raw: &str) -> Result<HashMap<String, serde_yaml::Value>> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_yaml::from_str(raw).map_err(|e| SyncError::Frontmatter(e.to_string()))
}

/// String value of a frontmatter key, if present and scalar.
pub fn string_field(frontmatter: &HashMap<String, serde_yaml::Value>, key: &str) -> Option<String> {
    match frontmatter.get(key)? {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Tags as a flat list; accepts a YAML sequence or a single comma-separated string.
pub fn tags_field(frontmatter: &HashMap<String, serde_yaml::Value>) -> Vec<String> {
    match frontmatter.get("tags") {
        Some(serde_yaml::Value::Sequence(seq)) => seq
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect(),
        Some(serde_yaml::Value::String(s)) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
