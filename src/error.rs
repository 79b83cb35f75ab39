//! Structural error taxonomy for the merge pipeline.
//!
//! Per-row data-quality problems (missing titles, out-of-range years, budget
//! rows that match nothing) never surface here; they are filtered locally and
//! counted through [`crate::clean::DropReason`]. Everything in
//! [`PipelineError`] stops the run and propagates to the command layer.

use std::path::PathBuf;

use thiserror::Error;

use crate::records::Source;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{source_name} source is missing required column '{column}'")]
    SchemaPrecondition {
        source_name: Source,
        column: String,
    },
    #[error("Failed to insert row {row} into table '{table}'; load rolled back")]
    InsertionFailure {
        table: &'static str,
        row: usize,
        #[source]
        cause: rusqlite::Error,
    },
    #[error("Store {path:?} exists but cannot be queried (rebuild with --rebuild)")]
    StoreUnreadable {
        path: PathBuf,
        #[source]
        cause: rusqlite::Error,
    },
    #[error("Invalid pipeline configuration: {0}")]
    Config(String),
    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },
    #[error("Row {row} in {path:?} is not valid {encoding}")]
    Decode {
        path: PathBuf,
        row: usize,
        encoding: &'static str,
    },
    #[error("CSV error in {path:?}")]
    Csv {
        path: PathBuf,
        #[source]
        cause: csv::Error,
    },
    #[error("SQLite error")]
    Sqlite(#[from] rusqlite::Error),
}

impl PipelineError {
    pub fn missing_column(source: Source, column: impl Into<String>) -> Self {
        PipelineError::SchemaPrecondition {
            source_name: source,
            column: column.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            cause,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, cause: csv::Error) -> Self {
        PipelineError::Csv {
            path: path.into(),
            cause,
        }
    }
}
