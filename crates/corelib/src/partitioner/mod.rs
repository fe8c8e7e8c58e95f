//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners are responsible for converting keys into tokens
//! that can be placed on the hash ring.

pub mod sip;
pub mod traits;
pub mod xxh3;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::token::Hash64Token;

pub use sip::Sip13Partitioner;
pub use traits::Partitioner;
pub use xxh3::Xxh3Partitioner;

/// Partitioner shared between a ring and its virtual nodes.
pub type SharedPartitioner = Arc<dyn Partitioner<TokenType = Hash64Token>>;

/// Configurable choice of partitioner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionerKind {
    #[default]
    Sip13,
    Xxh3,
}

impl PartitionerKind {
    pub fn build(self) -> SharedPartitioner {
        match self {
            PartitionerKind::Sip13 => Arc::new(Sip13Partitioner),
            PartitionerKind::Xxh3 => Arc::new(Xxh3Partitioner),
        }
    }
}

impl FromStr for PartitionerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sip13" => Ok(PartitionerKind::Sip13),
            "xxh3" => Ok(PartitionerKind::Xxh3),
            other => Err(Error::UnknownPartitioner(other.to_string())),
        }
    }
}

impl fmt::Display for PartitionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionerKind::Sip13 => f.write_str("sip13"),
            PartitionerKind::Xxh3 => f.write_str("xxh3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitioners_are_deterministic() {
        for kind in [PartitionerKind::Sip13, PartitionerKind::Xxh3] {
            let p = kind.build();
            assert_eq!(p.partition(b"/a.txt"), p.partition(b"/a.txt"));
            assert_ne!(p.partition(b"/a.txt"), p.partition(b"/b.txt"));
        }
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("XXH3".parse::<PartitionerKind>().unwrap(), PartitionerKind::Xxh3);
        assert!("murmur".parse::<PartitionerKind>().is_err());
        assert_eq!(PartitionerKind::default().to_string(), "sip13");
    }

    #[test]
    fn test_token_bounds_cover_the_key_space() {
        use crate::token::Token;
        for kind in [PartitionerKind::Sip13, PartitionerKind::Xxh3] {
            let p = kind.build();
            assert!(p.min_token().is_zero());
            assert!(p.max_token().is_max());
            let token = p.partition(b"/a.txt");
            assert!(p.min_token() <= token && token <= p.max_token());
        }
    }
}
