//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Instead of each storage node having a single token on the ring, each node
//! has `virtual_multiplier` tokens. This provides:
//!
//! 1. **Better Load Distribution**: More tokens = smoother distribution of paths
//! 2. **Gradual Rebalancing**: When nodes join/leave, only ~1/N of paths move
//! 3. **Fault Tolerance**: The keys of a dead node scatter over all survivors
//!
//! # Performance Characteristics
//!
//! - **Memory**: O(v) per node where v = virtual multiplier
//! - **Lookup**: O(log n) where n = total vnodes
//!
//! The metadata server defaults to 150 vnodes per storage node.

use crate::node::NodeId;
use crate::partitioner::Partitioner;
use crate::token::{Hash64Token, Token};

/// A virtual node on the hash ring.
///
/// Represents a single token position owned by a storage node.
///
/// # Invariants
///
/// - Every `VirtualNode` belongs to exactly one storage node
/// - Ordering is by token first, so a sorted list of vnodes is a ring walk
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualNode {
    /// Token position on the ring, the hash of `"node_id:vnode_index"`.
    pub token: Hash64Token,

    /// The storage node that owns this virtual node.
    pub node_id: NodeId,
}

impl VirtualNode {
    #[inline]
    pub fn new(token: Hash64Token, node_id: NodeId) -> Self {
        Self { token, node_id }
    }

    /// Create a virtual node from a node ID and vnode index.
    ///
    /// The token is `partitioner.partition("node_id:vnode_index")`, so the
    /// same node always lands on the same points for a given partitioner.
    pub fn from_index<P>(partitioner: &P, node_id: &NodeId, vnode_index: usize) -> Self
    where
        P: Partitioner<TokenType = Hash64Token> + ?Sized,
    {
        let vnode_key = format!("{}:{}", node_id, vnode_index);
        let token = partitioner.partition(vnode_key.as_bytes());
        Self::new(token, node_id.clone())
    }

    #[inline]
    pub fn token(&self) -> Hash64Token {
        self.token
    }

    #[inline]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Clockwise distance to another virtual node.
    #[inline]
    pub fn distance_to(&self, other: &Self) -> Hash64Token {
        self.token.distance_to(&other.token)
    }
}

impl std::fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VNode(token={:016x}, node={})", self.token.0, self.node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::Sip13Partitioner;

    #[test]
    fn test_vnode_creation() {
        let vnode = VirtualNode::new(Hash64Token(100), NodeId::new("n1"));
        assert_eq!(vnode.token(), Hash64Token(100));
        assert_eq!(vnode.node_id(), &NodeId::new("n1"));
    }

    #[test]
    fn test_vnode_from_index() {
        let p = Sip13Partitioner;
        let id = NodeId::new("n1");
        let vnode0 = VirtualNode::from_index(&p, &id, 0);
        let vnode1 = VirtualNode::from_index(&p, &id, 1);

        assert_ne!(vnode0.token(), vnode1.token());
        assert_eq!(vnode0.node_id(), vnode1.node_id());
        assert_eq!(vnode0, VirtualNode::from_index(&p, &id, 0));
    }

    #[test]
    fn test_vnode_distance() {
        let vnode1 = VirtualNode::new(Hash64Token(100), NodeId::new("n1"));
        let vnode2 = VirtualNode::new(Hash64Token(200), NodeId::new("n2"));
        assert_eq!(vnode1.distance_to(&vnode2), Hash64Token(100));
    }

    #[test]
    fn test_vnode_ordering() {
        let vnode1 = VirtualNode::new(Hash64Token(100), NodeId::new("z"));
        let vnode2 = VirtualNode::new(Hash64Token(200), NodeId::new("a"));
        assert!(vnode1 < vnode2);
    }
}
