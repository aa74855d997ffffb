use thiserror::Error;

use crate::ColumnType;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A draft that cannot be stored in a column of the given type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{input}' is not a valid {expected} value")]
pub struct CoercionError {
    pub input: String,
    pub expected: ColumnType,
}

impl CoercionError {
    pub fn new(input: impl Into<String>, expected: ColumnType) -> Self {
        Self {
            input: input.into(),
            expected,
        }
    }
}
