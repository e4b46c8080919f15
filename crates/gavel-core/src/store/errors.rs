use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: invalid JSONL record: {source}\n  Content: {snippet}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        snippet: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}:{line}: expected a JSON object, found {found}", path.display())]
    NotAnObject {
        path: PathBuf,
        line: usize,
        found: &'static str,
    },

    #[error("failed to serialize record for '{}': {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, line: usize, content: &str, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            line,
            snippet: content.chars().take(50).collect(),
            source,
        }
    }
}
