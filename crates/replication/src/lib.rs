//! Replication strategies for file placement.
//!
//! This crate decides which storage nodes hold the replicas of a file:
//! - How many replicas to create
//! - Which active nodes receive them, in ring order (primary first)
//! - Whether the resulting placement is degraded

pub mod error;
pub mod placement;
pub mod strategy;

pub use error::ReplicationError;
pub use placement::ReplicaPlacement;
pub use strategy::{ReplicationStrategy, SimpleStrategy};
