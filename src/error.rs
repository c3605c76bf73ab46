//! Error types for mobidump operations.

use thiserror::Error;

/// Errors that can occur while decoding a book or dumping it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid MOBI: {0}")]
    InvalidMobi(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, Error>;
