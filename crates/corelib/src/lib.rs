//! Core library for storage placement in the metadata server.
//!
//! This crate provides the fundamental abstractions for placing file data
//! on storage nodes:
//! - Token types and partitioners
//! - Storage node descriptors and virtual nodes
//! - The consistent hash ring and its builder
//! - The storage node registry with liveness tracking

pub mod error;
pub mod node;
pub mod partitioner;
pub mod registry;
pub mod ring;
pub mod token;
pub mod vnode;

pub use error::{Error, Result};
pub use node::{NodeId, StorageNode};
pub use partitioner::{Partitioner, PartitionerKind, SharedPartitioner};
pub use registry::{ClusterStatus, NodeRegistry};
pub use ring::{HashRing, RingBuilder, DEFAULT_VNODES};
pub use token::Token;
pub use vnode::VirtualNode;
