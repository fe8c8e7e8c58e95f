//! Error types for the metadata store.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetaError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("no such file: {0}")]
    NotFound(String),

    #[error("invalid path: {reason}")]
    InvalidPath { reason: &'static str },

    #[error("allocation of {bytes} bytes failed while creating a record")]
    NoMemory { bytes: usize },
}
