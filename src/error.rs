use std::io;
use std::path::{Path, PathBuf};

/// Everything that can abort a merge or the output provisioning before it.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("failed to {action} {path:?}: {source}")]
    Io {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{source_name}:{line_number}: {reason}")]
    Parse {
        source_name: String,
        line_number: usize,
        reason: String,
    },

    #[error("Dir {path:?} already exists. Remove it first or choose another one.")]
    AlreadyExists { path: PathBuf },

    #[error("merge cancelled")]
    Cancelled,
}

impl MergeError {
    pub fn io(path: impl AsRef<Path>, action: &'static str, source: io::Error) -> Self {
        MergeError::Io {
            path: path.as_ref().to_path_buf(),
            action,
            source,
        }
    }

    pub fn parse(source_name: &str, line_number: usize, reason: impl Into<String>) -> Self {
        MergeError::Parse {
            source_name: source_name.to_string(),
            line_number,
            reason: reason.into(),
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, MergeError::Parse { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self, MergeError::Io { .. })
    }
}

pub type MergeResult<T> = Result<T, MergeError>;
