//! Error types for replica placement.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    #[error("replication factor must be at least 1")]
    InvalidReplicationFactor,
    #[error("no active storage nodes")]
    NoActiveNodes,
}
