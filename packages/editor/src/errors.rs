//! Error types for the editor

use crate::changes::PayloadError;
use crate::ordering::OrderingError;
use cord_common::CommonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Value error: {0}")]
    Value(#[from] CommonError),

    #[error("Invalid payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("Ordering error: {0}")]
    Ordering(#[from] OrderingError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
