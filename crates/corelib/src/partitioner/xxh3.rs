//! XXH3 partitioner.

use xxhash_rust::xxh3::xxh3_64;

use crate::partitioner::traits::Partitioner;
use crate::token::Hash64Token;

/// Partitioner hashing keys with 64-bit XXH3.
#[derive(Clone, Debug, Default)]
pub struct Xxh3Partitioner;

impl Partitioner for Xxh3Partitioner {
    type TokenType = Hash64Token;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        Hash64Token(xxh3_64(key))
    }

    fn name(&self) -> &'static str {
        "Xxh3Partitioner"
    }
}
