//! Error types for the core library.

use thiserror::Error;

use crate::node::NodeId;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid node configuration
    #[error("Invalid node: {0}")]
    InvalidNode(String),
    /// Node is not registered
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    /// Ring operation failed
    #[error("Ring operation failed: {0}")]
    RingOperation(String),
    /// Unknown partitioner name
    #[error("Unknown partitioner: {0}")]
    UnknownPartitioner(String),
}
