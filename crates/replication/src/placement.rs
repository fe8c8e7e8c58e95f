//! The result of a placement decision.

use corelib::node::{NodeId, StorageNode};
use serde::{Deserialize, Serialize};

/// Storage nodes chosen for one key, primary first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaPlacement {
    /// Replication factor that was asked for.
    pub requested: usize,
    /// Selected nodes in ring order.
    pub replicas: Vec<StorageNode>,
}

impl ReplicaPlacement {
    pub fn primary(&self) -> Option<&StorageNode> {
        self.replicas.first()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.replicas.iter().map(|n| n.node_id.clone()).collect()
    }

    /// Fewer active nodes than the replication factor were available.
    pub fn is_degraded(&self) -> bool {
        self.replicas.len() < self.requested
    }
}
