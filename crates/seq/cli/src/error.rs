//! CLI error types

use thiserror::Error;

/// CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dictionary error: {0}")]
    Dictionary(#[from] seq_types::DictionaryError),

    #[error("sequence has {0} error diagnostic(s)")]
    Failed(usize),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
