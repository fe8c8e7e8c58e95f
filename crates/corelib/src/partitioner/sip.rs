//! SipHash-1-3 partitioner (the default).

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use crate::partitioner::traits::Partitioner;
use crate::token::Hash64Token;

/// Partitioner hashing keys with SipHash-1-3 under fixed zero keys.
#[derive(Clone, Debug, Default)]
pub struct Sip13Partitioner;

impl Partitioner for Sip13Partitioner {
    type TokenType = Hash64Token;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        let mut hasher = SipHasher13::new();
        hasher.write(key);
        Hash64Token(hasher.finish())
    }

    fn name(&self) -> &'static str {
        "Sip13Partitioner"
    }
}
