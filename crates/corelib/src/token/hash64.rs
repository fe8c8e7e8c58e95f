//! 64-bit hash token, the position type used by the ring.

use crate::token::traits::Token;

/// Token over the full `u64` key space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Hash64Token(pub u64);

impl Token for Hash64Token {
    fn zero() -> Self {
        Hash64Token(0)
    }

    fn max() -> Self {
        Hash64Token(u64::MAX)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0
    }

    fn is_max(&self) -> bool {
        self.0 == u64::MAX
    }

    fn distance_to(&self, other: &Self) -> Self {
        Hash64Token(other.0.wrapping_sub(self.0))
    }
}

impl Hash64Token {
    /// Fraction of the whole ring covered by this distance.
    pub fn as_fraction(&self) -> f64 {
        self.0 as f64 / (u64::MAX as f64 + 1.0)
    }
}
