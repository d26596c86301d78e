use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning a [`Value`](crate::Value) into entry text or back.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Corrupted cache entry: {reason}")]
    Corrupt { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Float value {0} cannot be stored")]
    NonFiniteFloat(f64),

    #[error("Value nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Missing field `{0}`")]
    MissingField(String),

    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
}

impl CodecError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        CodecError::Corrupt {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid cache configuration: {0}")]
    Config(String),

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CacheError>;
