use std::path::PathBuf;

/// Errors surfaced by synchronization passes and the derived stores.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse frontmatter: {0}")]
    Frontmatter(String),

    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
