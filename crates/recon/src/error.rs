use thiserror::Error;

use crate::model::Role;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad rename table, empty output, unknown preset, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// An uploaded file is neither delimited text nor a spreadsheet.
    #[error("cannot parse '{file}': {message}")]
    Parse { file: String, message: String },
    /// No file was supplied for a role.
    #[error("missing input file for role '{0}'")]
    MissingInput(Role),
    /// A required canonical column is absent after normalization.
    #[error("role '{role}': missing column '{column}'")]
    MissingColumn { role: Role, column: String },
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

/// Failures while joining and deriving columns.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// No rows survive a join.
    #[error("join {join}: {reason}")]
    JoinKey { join: &'static str, reason: String },
    #[error("role '{role}': duplicate join keys in column '{column}': {}", format_duplicates(.keys))]
    DuplicateKeys {
        role: Role,
        column: &'static str,
        keys: Vec<DuplicateKey>,
    },
    #[error("role '{role}', row {row}: cannot parse {column} value '{value}'")]
    InvalidValue {
        role: Role,
        row: usize,
        column: &'static str,
        value: String,
    },
    /// Margin requested on a zero received amount.
    #[error("order '{order_id}': margin undefined for zero received amount")]
    DivisionUndefined { order_id: String },
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub key: String,
    pub count: usize,
}

fn format_duplicates(keys: &[DuplicateKey]) -> String {
    keys.iter()
        .map(|d| format!("{:?} x{}", d.key, d.count))
        .collect::<Vec<_>>()
        .join(", ")
}
