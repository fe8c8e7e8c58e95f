//! Replication strategy abstractions.
//!
//! Replication strategies determine how many replicas to create and where
//! to place them on the ring.
//!
//! - **SimpleStrategy**: N replicas placed on the next N distinct active
//!   nodes clockwise from the key

pub mod simple;

pub use simple::SimpleStrategy;

use corelib::registry::NodeRegistry;

use crate::error::ReplicationError;
use crate::placement::ReplicaPlacement;

/// Trait for replication strategies.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as they are shared by
/// every connection handler.
pub trait ReplicationStrategy: Send + Sync + 'static {
    /// Number of replicas this strategy aims for.
    fn replication_factor(&self) -> usize;

    /// Chooses the nodes that should hold `key`.
    ///
    /// A placement with fewer replicas than the factor is returned when too
    /// few nodes are active; only an empty selection is an error.
    fn place(&self, registry: &NodeRegistry, key: &[u8]) -> Result<ReplicaPlacement, ReplicationError>;

    /// Strategy name (for logging/debugging).
    fn name(&self) -> &'static str;
}
