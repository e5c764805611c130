use thiserror::Error;

/// Errors shared by every crate that manipulates document values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommonError {
    /// An `undefined` leaf reached a write path. Persisting it would silently
    /// drop data, so merges refuse instead.
    #[error("Undefined value written at '{path}'")]
    UndefinedValue { path: String },

    #[error("Expected an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CommonError {
    fn from(e: serde_json::Error) -> Self {
        CommonError::Serialization(e.to_string())
    }
}
