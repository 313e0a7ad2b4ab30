use std::path::PathBuf;

use thiserror::Error;

/// Failures of the on-disk store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but does not hold the expected JSON.
    #[error("stored data in {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }
}

/// Failures of task repository operations.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("a task with id {0} already exists")]
    DuplicateId(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures talking to the generative-text service.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("an analysis is already running")]
    Busy,
}
