//! Token abstraction module for consistent hashing.
//!
//! Tokens represent positions on the hash ring and must be comparable,
//! hashable, and thread-safe.

pub mod hash64;
pub mod traits;

pub use hash64::Hash64Token;
pub use traits::Token;
