//! Error taxonomy for dataset, artifact and configuration loading

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The transaction dataset could not be read or did not match its schema.
///
/// Fatal: no partial dataset is ever handed out.
#[derive(Debug, Error)]
pub enum DataFormatError {
    #[error("cannot read dataset {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse dataset {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("dataset {path} is missing required columns: {}", .columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("dataset {path}: column '{column}' is empty at row {row}")]
    NullValue {
        path: PathBuf,
        column: String,
        row: usize,
    },

    #[error("dataset {path}: unparsable date '{value}' in '{column}' at row {row}")]
    InvalidDate {
        path: PathBuf,
        column: String,
        row: usize,
        value: String,
    },

    #[error("dataset {path}: {column} out of range at row {row}: {detail}")]
    OutOfRange {
        path: PathBuf,
        column: String,
        row: usize,
        detail: String,
    },
}

/// A forecast or cluster artifact could not be used.
///
/// Only the affected artifact is unavailable; the dataset stays usable.
#[derive(Debug, Error)]
pub enum ArtifactSchemaError {
    #[error("cannot read {artifact} artifact {path}: {source}")]
    Unreadable {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {artifact} artifact {path}: {message}")]
    Parse {
        artifact: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("{artifact} artifact {path} is missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        artifact: &'static str,
        path: PathBuf,
        columns: Vec<String>,
    },

    #[error("{artifact} artifact {path}: bad value in '{column}' at row {row}: {detail}")]
    BadValue {
        artifact: &'static str,
        path: PathBuf,
        column: String,
        row: usize,
        detail: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cluster label key '{0}' is not an integer")]
    BadClusterKey(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    DataFormat(#[from] DataFormatError),

    #[error(transparent)]
    ArtifactSchema(#[from] ArtifactSchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a non-fatal forecast check found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// `yhat_lower <= yhat <= yhat_upper` does not hold.
    IntervalOrder,
    /// Date is not after the previous row's date.
    NonMonotonicDate,
    /// Date skips at least one calendar month after the previous row.
    MonthGap,
    /// Date lands in the same calendar month as the previous row.
    DuplicateMonth,
}

/// Non-fatal diagnostic raised while loading a forecast artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationWarning {
    /// 1-based data row the warning refers to.
    pub row: usize,
    pub kind: WarningKind,
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}
