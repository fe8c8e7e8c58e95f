//! Consistent hash ring implementation.
//!
//! The ring manages token positions and provides efficient lookup
//! operations for finding the storage nodes responsible for a path.

pub mod ring;

pub use ring::{HashRing, RingBuilder, DEFAULT_VNODES};
