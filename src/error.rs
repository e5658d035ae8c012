use std::path::PathBuf;

use thiserror::Error;

/// Fatal, pre-loop failures of a watch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("cannot watch directory {}: {source}", .directory.display())]
    Subscription {
        directory: PathBuf,
        #[source]
        source: notify::Error,
    },
}

impl WatchError {
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        WatchError::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    pub fn subscription(directory: impl Into<PathBuf>, source: notify::Error) -> Self {
        WatchError::Subscription {
            directory: directory.into(),
            source,
        }
    }
}
