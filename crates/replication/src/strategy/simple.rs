//! Simple replication strategy.
//!
//! Places N replicas sequentially around the ring (clockwise from the key).
//!
//! # Algorithm
//!
//! 1. Hash the key and walk the ring clockwise from its token
//! 2. Collect each distinct storage node the first time it is seen
//! 3. Skip nodes the registry reports as inactive and keep walking
//! 4. Stop at N nodes or when every node has been visited
//!
//! # Limitations
//!
//! - Doesn't consider capacity or free space
//! - May place replicas on nodes in the same failure domain

use corelib::registry::NodeRegistry;
use tracing::{debug, warn};

use crate::error::ReplicationError;
use crate::placement::ReplicaPlacement;
use crate::strategy::ReplicationStrategy;

/// Simple replication strategy: N replicas placed sequentially around the ring.
#[derive(Debug, Clone)]
pub struct SimpleStrategy {
    /// Number of replicas to create (including primary).
    replication_factor: usize,
}

impl SimpleStrategy {
    pub fn new(replication_factor: usize) -> Result<Self, ReplicationError> {
        if replication_factor == 0 {
            return Err(ReplicationError::InvalidReplicationFactor);
        }
        Ok(Self { replication_factor })
    }
}

impl Default for SimpleStrategy {
    /// Three replicas, the DistFS default.
    fn default() -> Self {
        Self {
            replication_factor: 3,
        }
    }
}

impl ReplicationStrategy for SimpleStrategy {
    fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    fn place(&self, registry: &NodeRegistry, key: &[u8]) -> Result<ReplicaPlacement, ReplicationError> {
        let replicas = registry.select_storage_nodes(key, self.replication_factor);
        if replicas.is_empty() {
            return Err(ReplicationError::NoActiveNodes);
        }
        let placement = ReplicaPlacement {
            requested: self.replication_factor,
            replicas,
        };
        if placement.is_degraded() {
            warn!(
                requested = self.replication_factor,
                selected = placement.replicas.len(),
                "degraded placement"
            );
        } else {
            debug!(replicas = ?placement.node_ids(), "placed key");
        }
        Ok(placement)
    }

    fn name(&self) -> &'static str {
        "SimpleStrategy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::node::StorageNode;

    fn registry(n: usize) -> NodeRegistry {
        let registry = NodeRegistry::default();
        for i in 0..n {
            registry
                .register(StorageNode::new(format!("node{}", i), "127.0.0.1", 9000 + i as u16, 100))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_simple_strategy_replication_factor() {
        assert_eq!(SimpleStrategy::new(3).unwrap().replication_factor(), 3);
        assert_eq!(SimpleStrategy::default().replication_factor(), 3);
        assert_eq!(
            SimpleStrategy::new(0).unwrap_err(),
            ReplicationError::InvalidReplicationFactor
        );
    }

    #[test]
    fn test_simple_strategy_replicas() {
        let registry = registry(4);
        let placement = SimpleStrategy::new(3).unwrap().place(&registry, b"test-key").unwrap();

        assert_eq!(placement.replicas.len(), 3);
        assert!(!placement.is_degraded());
        let unique: std::collections::HashSet<_> = placement.node_ids().into_iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_degraded_and_empty() {
        let registry = registry(2);
        let strategy = SimpleStrategy::new(3).unwrap();
        assert!(strategy.place(&registry, b"k").unwrap().is_degraded());

        registry.mark_inactive(&"node0".into()).unwrap();
        registry.mark_inactive(&"node1".into()).unwrap();
        assert_eq!(
            strategy.place(&registry, b"k").unwrap_err(),
            ReplicationError::NoActiveNodes
        );
    }
}
