//! Storage node abstractions for the consistent hash ring.
//!
//! Nodes are identified by a `NodeId` string chosen by the operator (for
//! example `storage-01`). The ring only ever sees the id; the rest of the
//! descriptor (address, capacity, liveness) lives in the registry.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Maximum length of a node id, in bytes.
pub const MAX_NODE_ID_LEN: usize = 63;

/// Identifier for a storage node in the cluster.
///
/// Backed by an `Arc<str>` so cloning into every virtual node is cheap.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// Seconds since the UNIX epoch, saturating to 0 if the clock is before it.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A storage node known to the metadata server.
///
/// Created on registration and mutated only by heartbeat and liveness
/// events. Nodes that miss heartbeats are marked inactive, never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNode {
    pub node_id: NodeId,
    pub address: String,
    pub port: u16,
    /// Total capacity in bytes.
    pub capacity: u64,
    pub used_space: u64,
    pub free_space: u64,
    /// UNIX seconds of the last heartbeat (or registration).
    pub last_heartbeat: u64,
    pub active: bool,
}

impl StorageNode {
    /// Construct an active node with no space used.
    pub fn new(
        node_id: impl Into<NodeId>,
        address: impl Into<String>,
        port: u16,
        capacity: u64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            address: address.into(),
            port,
            capacity,
            used_space: 0,
            free_space: capacity,
            last_heartbeat: unix_now(),
            active: true,
        }
    }

    /// `address:port`, as used when connecting to the node.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display_and_eq() {
        let a = NodeId::new("storage-01");
        let b: NodeId = "storage-01".into();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "storage-01");
    }

    #[test]
    fn test_storage_node_defaults() {
        let node = StorageNode::new("storage-01", "10.0.0.1", 9528, 1 << 30);
        assert!(node.active);
        assert_eq!(node.used_space, 0);
        assert_eq!(node.free_space, 1 << 30);
        assert_eq!(node.endpoint(), "10.0.0.1:9528");
    }
}
