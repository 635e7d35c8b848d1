use std::path::PathBuf;

use thiserror::Error;

/// Failures while building a crisis store from supplied data.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate crisis id {0}")]
    DuplicateId(String),

    #[error("crisis record with empty id (title {0:?})")]
    EmptyId(String),

    #[error("crisis {id} has confidence {value}, expected 0-100")]
    ConfidenceOutOfRange { id: String, value: u8 },

    #[error("unsupported data file {0}, expected .json or .csv")]
    UnsupportedFormat(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
