//! Inode allocation.
//!
//! A single atomic counter, independent from the store's shard locks, so
//! allocating never blocks lookups of unrelated paths. The counter lives in
//! memory only; a restarted server starts again at 1.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

/// First inode handed out by a fresh allocator.
pub const FIRST_INODE: u64 = 1;

#[derive(Debug)]
pub struct InodeAllocator {
    next: CachePadded<AtomicU64>,
}

impl InodeAllocator {
    pub fn new() -> Self {
        Self::starting_at(FIRST_INODE)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: CachePadded::new(AtomicU64::new(first)),
        }
    }

    /// Returns a never-before-issued inode. Values are strictly increasing
    /// in issue order.
    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The value the next call to `allocate` will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for InodeAllocator {
    fn default() -> Self {
        Self::new()
    }
}
