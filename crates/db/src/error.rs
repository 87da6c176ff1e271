use std::path::PathBuf;

use bookstore_kernel::InvocationError;
use thiserror::Error;

/// Errors raised by the memory datasource
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entity not found: {model} with id {id}")]
    NotFound { model: String, id: u64 },

    #[error("invalid record for {model}: {reason}")]
    InvalidRecord { model: String, reason: String },

    #[error("invalid order clause '{0}'; expected '<field> [ASC|DESC]'")]
    InvalidOrder(String),

    #[error("failed to encode or decode a record")]
    Codec(#[from] serde_json::Error),

    #[error("failed to access datasource file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<StoreError> for InvocationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => InvocationError::not_found(err.to_string()),
            StoreError::InvalidRecord { .. } | StoreError::InvalidOrder(_) => {
                InvocationError::unprocessable(err.to_string())
            }
            other => InvocationError::Internal(other.into()),
        }
    }
}
