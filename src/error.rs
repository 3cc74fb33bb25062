use std::fmt;

use thiserror::Error;

/// Why a fetch did not produce a usable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The transport answered with a non-2xx status.
    Status(u16),
    /// The request never produced a status (connection refused, I/O error, ...).
    Transport(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "{}", code),
            Self::Transport(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Failed to load manifest: {0}")]
    ManifestFetch(FetchFailure),

    #[error("Manifest is not valid JSON: {0}")]
    ManifestParse(#[source] serde_json::Error),

    #[error("Unexpected manifest shape: {0}")]
    ManifestShape(String),

    #[error("Error loading {path}: {failure}")]
    RecordFetch { path: String, failure: FetchFailure },

    #[error("Error parsing {path}: {source}")]
    RecordParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ViewerError {
    /// Manifest failures block the whole viewer; record failures only the current record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ManifestFetch(_) | Self::ManifestParse(_) | Self::ManifestShape(_)
        )
    }
}
