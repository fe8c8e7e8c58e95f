//! Hash ring data structure.
//!
//! Holds a `BTreeMap<Hash64Token, NodeId>` of virtual node positions and the
//! walk used for replica placement.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::node::NodeId;
use crate::partitioner::{SharedPartitioner, Sip13Partitioner};
use crate::token::{Hash64Token, Token};
use crate::vnode::VirtualNode;

/// Virtual nodes per storage node when nothing else is configured.
pub const DEFAULT_VNODES: usize = 150;

#[derive(Debug, Default)]
struct RingState {
    /// Ring position -> owning node.
    tokens: BTreeMap<Hash64Token, NodeId>,
    /// Storage node -> number of virtual nodes it was placed with.
    nodes: BTreeMap<NodeId, usize>,
    /// Vnode count for nodes added without an explicit one.
    virtual_multiplier: usize,
}

impl RingState {
    /// Claims a position. On a token collision the smaller node id wins, so
    /// the final layout does not depend on insertion order.
    fn place(&mut self, vnode: VirtualNode) {
        match self.tokens.get(&vnode.token) {
            Some(owner) if *owner <= vnode.node_id => {}
            _ => {
                self.tokens.insert(vnode.token, vnode.node_id);
            }
        }
    }

    fn place_node(&mut self, partitioner: &SharedPartitioner, node_id: &NodeId, vnodes: usize) {
        for index in 0..vnodes {
            self.place(VirtualNode::from_index(partitioner.as_ref(), node_id, index));
        }
    }

    fn rebuild(&mut self, partitioner: &SharedPartitioner) {
        self.tokens.clear();
        let nodes: Vec<(NodeId, usize)> =
            self.nodes.iter().map(|(id, n)| (id.clone(), *n)).collect();
        for (node_id, vnodes) in &nodes {
            self.place_node(partitioner, node_id, *vnodes);
        }
    }
}

/// Consistent hash ring mapping keys to an ordered list of storage nodes.
///
/// All methods take `&self`; membership changes take the write lock, lookups
/// take the read lock.
pub struct HashRing {
    state: RwLock<RingState>,
    partitioner: SharedPartitioner,
}

impl HashRing {
    /// Empty ring with the default partitioner and vnode multiplier.
    pub fn new() -> Self {
        Self::with_partitioner(Arc::new(Sip13Partitioner), DEFAULT_VNODES)
    }

    pub fn with_partitioner(partitioner: SharedPartitioner, virtual_multiplier: usize) -> Self {
        Self {
            state: RwLock::new(RingState {
                virtual_multiplier: virtual_multiplier.max(1),
                ..RingState::default()
            }),
            partitioner,
        }
    }

    /// Adds a node with the ring's default vnode multiplier.
    ///
    /// Returns `false` if the node is already on the ring; adding twice is a
    /// no-op.
    pub fn add_node(&self, node_id: NodeId) -> bool {
        self.insert_node(node_id, None)
    }

    pub fn add_node_with_vnodes(&self, node_id: NodeId, vnodes: usize) -> bool {
        self.insert_node(node_id, Some(vnodes))
    }

    fn insert_node(&self, node_id: NodeId, vnodes: Option<usize>) -> bool {
        let mut state = self.state.write();
        if state.nodes.contains_key(&node_id) {
            return false;
        }
        let vnodes = vnodes.unwrap_or(state.virtual_multiplier).max(1);
        state.place_node(&self.partitioner, &node_id, vnodes);
        state.nodes.insert(node_id.clone(), vnodes);
        debug!(node = %node_id, vnodes, "added node to ring");
        true
    }

    /// Removes a node and all its virtual nodes.
    ///
    /// Positions are recomputed from the remaining nodes so that collision
    /// losers reclaim their points.
    pub fn remove_node(&self, node_id: &NodeId) -> bool {
        let mut state = self.state.write();
        if state.nodes.remove(node_id).is_none() {
            return false;
        }
        state.rebuild(&self.partitioner);
        debug!(node = %node_id, "removed node from ring");
        true
    }

    /// Re-places every node with a new vnode multiplier, which also becomes
    /// the default for nodes added afterwards.
    pub fn rebuild(&self, virtual_multiplier: usize) {
        let virtual_multiplier = virtual_multiplier.max(1);
        let mut state = self.state.write();
        state.virtual_multiplier = virtual_multiplier;
        for vnodes in state.nodes.values_mut() {
            *vnodes = virtual_multiplier;
        }
        state.rebuild(&self.partitioner);
    }

    /// Primary node for `key`: the owner of the first position at or after
    /// the key's token, wrapping around.
    pub fn lookup(&self, key: &[u8]) -> Option<NodeId> {
        self.get_nodes(key, 1).into_iter().next()
    }

    /// Up to `replica_count` distinct nodes in ring order starting at the
    /// key's token. Returns fewer if the ring holds fewer nodes.
    pub fn get_nodes(&self, key: &[u8], replica_count: usize) -> Vec<NodeId> {
        self.get_nodes_where(key, replica_count, |_| true)
    }

    /// Same walk as [`get_nodes`](Self::get_nodes), but nodes rejected by
    /// `accept` are skipped and the walk continues past them.
    ///
    /// `accept` is called at most once per distinct node, under the ring's
    /// read lock.
    pub fn get_nodes_where<F>(&self, key: &[u8], replica_count: usize, mut accept: F) -> Vec<NodeId>
    where
        F: FnMut(&NodeId) -> bool,
    {
        if replica_count == 0 {
            return Vec::new();
        }
        let start = self.partitioner.partition(key);
        let state = self.state.read();
        let node_count = state.nodes.len();

        let mut selected = Vec::with_capacity(replica_count.min(node_count));
        let mut seen: HashSet<&NodeId> = HashSet::with_capacity(node_count);
        let walk = state.tokens.range(start..).chain(state.tokens.range(..start));
        for (_, node_id) in walk {
            if selected.len() >= replica_count || seen.len() >= node_count {
                break;
            }
            if !seen.insert(node_id) {
                continue;
            }
            if accept(node_id) {
                selected.push(node_id.clone());
            }
        }
        selected
    }

    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.state.read().nodes.contains_key(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn token_count(&self) -> usize {
        self.state.read().tokens.len()
    }

    /// All nodes on the ring, sorted by id.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.state.read().nodes.keys().cloned().collect()
    }

    /// All positions in ring order (for debugging and tests).
    pub fn tokens(&self) -> Vec<(Hash64Token, NodeId)> {
        self.state
            .read()
            .tokens
            .iter()
            .map(|(t, n)| (*t, n.clone()))
            .collect()
    }

    /// Fraction of the key space owned by each node.
    ///
    /// A position owns the arc from the previous position (exclusive) up to
    /// itself (inclusive), matching the lookup walk.
    pub fn ownership(&self) -> HashMap<NodeId, f64> {
        let state = self.state.read();
        let mut shares: HashMap<NodeId, f64> = HashMap::with_capacity(state.nodes.len());
        let mut prev = match state.tokens.iter().next_back() {
            Some((token, _)) => *token,
            None => return shares,
        };
        if state.tokens.len() == 1 {
            if let Some(owner) = state.tokens.values().next() {
                shares.insert(owner.clone(), 1.0);
            }
            return shares;
        }
        for (token, owner) in &state.tokens {
            *shares.entry(owner.clone()).or_default() += prev.distance_to(token).as_fraction();
            prev = *token;
        }
        shares
    }

    pub fn virtual_multiplier(&self) -> usize {
        self.state.read().virtual_multiplier
    }

    pub fn partitioner_name(&self) -> &'static str {
        self.partitioner.name()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("partitioner", &self.partitioner.name())
            .field("virtual_multiplier", &self.virtual_multiplier())
            .field("nodes", &self.node_count())
            .field("tokens", &self.token_count())
            .finish()
    }
}

/// Builder for a populated ring.
pub struct RingBuilder {
    partitioner: SharedPartitioner,
    vnodes: usize,
    nodes: Vec<(NodeId, Option<usize>)>,
}

impl RingBuilder {
    pub fn new() -> Self {
        Self {
            partitioner: Arc::new(Sip13Partitioner),
            vnodes: DEFAULT_VNODES,
            nodes: Vec::new(),
        }
    }

    /// Default vnode multiplier for nodes added without an explicit count.
    pub fn with_vnodes(mut self, vnodes: usize) -> Self {
        self.vnodes = vnodes;
        self
    }

    pub fn with_partitioner(mut self, partitioner: SharedPartitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn add_node(mut self, node_id: impl Into<NodeId>) -> Self {
        self.nodes.push((node_id.into(), None));
        self
    }

    pub fn add_node_with_vnodes(mut self, node_id: impl Into<NodeId>, vnodes: usize) -> Self {
        self.nodes.push((node_id.into(), Some(vnodes)));
        self
    }

    pub fn build(self) -> HashRing {
        let ring = HashRing::with_partitioner(self.partitioner, self.vnodes);
        for (node_id, vnodes) in self.nodes {
            ring.insert_node(node_id, vnodes);
        }
        ring
    }
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_returns_distinct_nodes() {
        let ring = RingBuilder::new()
            .with_vnodes(16)
            .add_node("a")
            .add_node("b")
            .add_node("c")
            .build();
        let nodes = ring.get_nodes(b"/data/file", 3);
        assert_eq!(nodes.len(), 3);
        let unique: HashSet<_> = nodes.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_walk_partial_when_short_of_nodes() {
        let ring = RingBuilder::new().with_vnodes(8).add_node("a").add_node("b").build();
        assert_eq!(ring.get_nodes(b"key", 5).len(), 2);
        assert!(ring.get_nodes(b"key", 0).is_empty());
    }

    #[test]
    fn test_walk_skips_rejected_nodes() {
        let ring = RingBuilder::new()
            .with_vnodes(16)
            .add_node("a")
            .add_node("b")
            .add_node("c")
            .build();
        let full = ring.get_nodes(b"k", 3);
        let skipped = full[0].clone();
        let filtered = ring.get_nodes_where(b"k", 2, |id| *id != skipped);
        assert_eq!(filtered, full[1..].to_vec());
    }

    #[test]
    fn test_collision_resolution_is_order_independent() {
        let mut a = RingState::default();
        let mut b = RingState::default();
        let x = VirtualNode::new(Hash64Token(7), NodeId::new("x"));
        let y = VirtualNode::new(Hash64Token(7), NodeId::new("y"));
        a.place(x.clone());
        a.place(y.clone());
        b.place(y);
        b.place(x);
        assert_eq!(a.tokens, b.tokens);
        assert_eq!(a.tokens[&Hash64Token(7)], NodeId::new("x"));
    }

    #[test]
    fn test_ownership_sums_to_one() {
        let ring = RingBuilder::new()
            .with_vnodes(64)
            .add_node("a")
            .add_node("b")
            .add_node("c")
            .build();
        let total: f64 = ring.ownership().values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebuild_changes_multiplier() {
        let ring = RingBuilder::new().with_vnodes(4).add_node("a").add_node("b").build();
        assert_eq!(ring.token_count(), 8);
        ring.rebuild(10);
        assert_eq!(ring.token_count(), 20);
    }

    #[test]
    fn test_rebuild_sets_multiplier_for_later_nodes() {
        let ring = RingBuilder::new().with_vnodes(4).add_node("a").build();
        ring.rebuild(10);
        assert_eq!(ring.virtual_multiplier(), 10);
        assert!(ring.add_node(NodeId::new("b")));
        assert_eq!(ring.token_count(), 20);
    }
}
