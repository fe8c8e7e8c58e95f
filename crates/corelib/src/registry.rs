//! Storage node registry.
//!
//! Tracks every storage node that has registered with the metadata server,
//! together with its liveness. Nodes are indexed by id for O(1) membership
//! checks; the hash ring is consulted only for ordering.
//!
//! The registry's locks (the `DashMap` shards and the ring's `RwLock`) are
//! independent from the metadata store. Registration and removal update the
//! ring while holding the node's shard lock, so the ring and the map always
//! agree on membership. Lock order is shard first, ring second. Selection
//! snapshots liveness before it takes the ring read lock and never holds a
//! shard lock underneath it.

use std::collections::HashSet;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::node::{unix_now, NodeId, StorageNode, MAX_NODE_ID_LEN};
use crate::ring::HashRing;

/// Aggregate view of the cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub total_capacity: u64,
    pub used_capacity: u64,
}

pub struct NodeRegistry {
    nodes: DashMap<NodeId, StorageNode>,
    ring: HashRing,
}

impl NodeRegistry {
    pub fn new(ring: HashRing) -> Self {
        Self {
            nodes: DashMap::new(),
            ring,
        }
    }

    /// Registers a node, or refreshes it if the id is already known.
    ///
    /// Returns `true` if the node is new. Re-registration replaces the
    /// descriptor and marks the node active.
    pub fn register(&self, mut node: StorageNode) -> Result<bool> {
        let id = node.node_id.as_str();
        if id.is_empty() || id.len() > MAX_NODE_ID_LEN {
            return Err(Error::InvalidNode(format!(
                "node id must be 1..={} bytes, got {}",
                MAX_NODE_ID_LEN,
                id.len()
            )));
        }
        if node.address.is_empty() {
            return Err(Error::InvalidNode(format!("node {} has no address", id)));
        }

        node.active = true;
        node.last_heartbeat = unix_now();
        let node_id = node.node_id.clone();
        let is_new = match self.nodes.entry(node_id.clone()) {
            Entry::Occupied(mut slot) => {
                slot.insert(node);
                false
            }
            Entry::Vacant(slot) => {
                self.ring.add_node(node_id.clone());
                slot.insert(node);
                true
            }
        };

        if is_new {
            info!(node = %node_id, "registered storage node");
        } else {
            debug!(node = %node_id, "re-registered storage node");
        }
        Ok(is_new)
    }

    /// Removes a node from the registry and the ring.
    pub fn deregister(&self, node_id: &NodeId) -> Result<StorageNode> {
        match self.nodes.entry(node_id.clone()) {
            Entry::Occupied(slot) => {
                self.ring.remove_node(node_id);
                let node = slot.remove();
                info!(node = %node_id, "deregistered storage node");
                Ok(node)
            }
            Entry::Vacant(_) => Err(Error::NodeNotFound(node_id.clone())),
        }
    }

    /// Records a heartbeat. Returns `true` if the node was reactivated.
    pub fn heartbeat(&self, node_id: &NodeId, used_space: u64, free_space: u64) -> Result<bool> {
        self.heartbeat_at(node_id, used_space, free_space, unix_now())
    }

    pub fn heartbeat_at(
        &self,
        node_id: &NodeId,
        used_space: u64,
        free_space: u64,
        now: u64,
    ) -> Result<bool> {
        let mut node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| Error::NodeNotFound(node_id.clone()))?;
        node.used_space = used_space;
        node.free_space = free_space;
        node.last_heartbeat = now;
        let reactivated = !node.active;
        node.active = true;
        if reactivated {
            info!(node = %node_id, "storage node back online");
        }
        Ok(reactivated)
    }

    pub fn mark_active(&self, node_id: &NodeId) -> Result<()> {
        self.set_active(node_id, true)
    }

    pub fn mark_inactive(&self, node_id: &NodeId) -> Result<()> {
        self.set_active(node_id, false)
    }

    fn set_active(&self, node_id: &NodeId, active: bool) -> Result<()> {
        let mut node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| Error::NodeNotFound(node_id.clone()))?;
        node.active = active;
        Ok(())
    }

    /// Marks inactive every active node whose last heartbeat is older than
    /// `timeout`. Returns the ids that changed state.
    pub fn expire_stale(&self, timeout: Duration) -> Vec<NodeId> {
        self.expire_stale_at(unix_now(), timeout)
    }

    pub fn expire_stale_at(&self, now: u64, timeout: Duration) -> Vec<NodeId> {
        let timeout = timeout.as_secs();
        let mut expired = Vec::new();
        for mut entry in self.nodes.iter_mut() {
            let node = entry.value_mut();
            if node.active && now.saturating_sub(node.last_heartbeat) > timeout {
                node.active = false;
                expired.push(node.node_id.clone());
            }
        }
        for node_id in &expired {
            warn!(node = %node_id, "storage node missed heartbeats, marked inactive");
        }
        expired
    }

    pub fn is_active(&self, node_id: &NodeId) -> bool {
        self.nodes.get(node_id).map_or(false, |n| n.active)
    }

    /// Up to `replica_count` active nodes for `key`, in ring order.
    ///
    /// Inactive nodes are skipped and the walk continues past them, so the
    /// result equals a ring built from active nodes only.
    pub fn select_storage_nodes(&self, key: &[u8], replica_count: usize) -> Vec<StorageNode> {
        let active: HashSet<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.active)
            .map(|n| n.key().clone())
            .collect();
        self.ring
            .get_nodes_where(key, replica_count, |id| active.contains(id))
            .into_iter()
            .filter_map(|id| self.get(&id))
            .collect()
    }

    pub fn get(&self, node_id: &NodeId) -> Option<StorageNode> {
        self.nodes.get(node_id).map(|n| n.value().clone())
    }

    /// Snapshot of all nodes, sorted by id.
    pub fn nodes(&self) -> Vec<StorageNode> {
        let mut nodes: Vec<StorageNode> = self.nodes.iter().map(|n| n.value().clone()).collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.active).count()
    }

    pub fn cluster_status(&self) -> ClusterStatus {
        self.nodes.iter().fold(ClusterStatus::default(), |mut status, n| {
            status.total_nodes += 1;
            if n.active {
                status.active_nodes += 1;
            }
            status.total_capacity = status.total_capacity.saturating_add(n.capacity);
            status.used_capacity = status.used_capacity.saturating_add(n.used_space);
            status
        })
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new(HashRing::new())
    }
}
