//! Error types for the recovery store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or persisting recovery entries.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// No data directory could be derived from the environment.
    #[error("unable to determine data directory (set XDG_DATA_HOME or HOME)")]
    DataDirUnavailable,

    /// Reading the file or preparing its directory failed.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but does not hold a valid entry list.
    #[error("recovery file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Entries could not be encoded.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// The temporary file could not replace the recovery file.
    #[error("failed to persist recovery file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The entry failed validation and was not written.
    #[error("invalid recovery entry: {reason}")]
    InvalidEntry { reason: &'static str },
}

impl RecoveryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_entry_display() {
        let err = RecoveryError::InvalidEntry {
            reason: "key must not be empty",
        };
        assert_eq!(
            err.to_string(),
            "invalid recovery entry: key must not be empty"
        );
    }

    #[test]
    fn test_io_display_includes_path() {
        let err = RecoveryError::io(
            "/tmp/state.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/state.json"));
    }
}
