//! Path-indexed metadata store.
//!
//! Records live in a `DashMap` keyed by path. Each operation runs inside the
//! critical section of the shard that owns the path, which gives per-path
//! mutual exclusion without serializing unrelated paths.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MetaError, Result};
use crate::inode::InodeAllocator;
use crate::record::{now_secs, validate_path, FileRecord, Owner};

/// Counters describing the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub live_records: usize,
    pub total_created: u64,
    pub total_removed: u64,
    pub next_inode: u64,
}

#[derive(Debug, Default)]
pub struct MetadataStore {
    records: DashMap<String, FileRecord>,
    inodes: InodeAllocator,
    created: AtomicU64,
    removed: AtomicU64,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root-owned record for `path` and returns its inode.
    pub fn create(&self, path: &str, mode: u32) -> Result<u64> {
        self.create_as(path, mode, Owner::ROOT)
    }

    /// Creates a record for `path` owned by `owner`.
    ///
    /// The existence check, inode assignment and insert happen under the
    /// same shard lock. Buffers are reserved before the inode is drawn, so a
    /// failed allocation consumes no inode and inserts nothing.
    pub fn create_as(&self, path: &str, mode: u32, owner: Owner) -> Result<u64> {
        validate_path(path)?;
        let key = try_clone_path(path)?;
        let mut record = FileRecord::new(0, try_clone_path(path)?, mode, owner, now_secs());

        match self.records.entry(key) {
            Entry::Occupied(_) => Err(MetaError::FileExists(path.to_string())),
            Entry::Vacant(slot) => {
                let inode = self.inodes.allocate();
                record.inode = inode;
                slot.insert(record);
                self.created.fetch_add(1, Ordering::Relaxed);
                debug!(path, inode, mode = format_args!("{:o}", mode), "created file record");
                Ok(inode)
            }
        }
    }

    /// Returns a copy of the record for `path`.
    pub fn lookup(&self, path: &str) -> Result<FileRecord> {
        self.records
            .get(path)
            .map(|r| r.value().clone())
            .ok_or_else(|| MetaError::NotFound(path.to_string()))
    }

    /// Removes the record for `path` and returns it.
    pub fn remove(&self, path: &str) -> Result<FileRecord> {
        let (_, record) = self
            .records
            .remove(path)
            .ok_or_else(|| MetaError::NotFound(path.to_string()))?;
        self.removed.fetch_add(1, Ordering::Relaxed);
        debug!(path, inode = record.inode, "removed file record");
        Ok(record)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            live_records: self.records.len(),
            total_created: self.created.load(Ordering::Relaxed),
            total_removed: self.removed.load(Ordering::Relaxed),
            next_inode: self.inodes.peek(),
        }
    }
}

fn try_clone_path(path: &str) -> Result<String> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(path.len())
        .map_err(|_| MetaError::NoMemory { bytes: path.len() })?;
    owned.push_str(path);
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_lookup_remove() {
        let store = MetadataStore::new();
        let ino = store.create("/a.txt", 0o644).unwrap();
        assert_eq!(ino, 1);

        let rec = store.lookup("/a.txt").unwrap();
        assert_eq!(rec.inode, 1);
        assert_eq!(rec.mode, 0o644);
        assert_eq!(rec.path, "/a.txt");

        let removed = store.remove("/a.txt").unwrap();
        assert_eq!(removed.inode, 1);
        assert_eq!(store.lookup("/a.txt"), Err(MetaError::NotFound("/a.txt".into())));
    }

    #[test]
    fn test_duplicate_create_keeps_original() {
        let store = MetadataStore::new();
        let first = store.create("/dup", 0o600).unwrap();
        assert_eq!(
            store.create("/dup", 0o777),
            Err(MetaError::FileExists("/dup".into()))
        );
        let rec = store.lookup("/dup").unwrap();
        assert_eq!(rec.inode, first);
        assert_eq!(rec.mode, 0o600);
        // The failed create must not burn an inode.
        assert_eq!(store.stats().next_inode, first + 1);
    }

    #[test]
    fn test_remove_missing() {
        let store = MetadataStore::new();
        assert_eq!(store.remove("/nope"), Err(MetaError::NotFound("/nope".into())));
    }

    #[test]
    fn test_inodes_never_reused() {
        let store = MetadataStore::new();
        let mut last = 0;
        for _ in 0..5 {
            let ino = store.create("/cycle", 0o644).unwrap();
            assert!(ino > last);
            last = ino;
            store.remove("/cycle").unwrap();
        }
        let stats = store.stats();
        assert_eq!(stats.total_created, 5);
        assert_eq!(stats.total_removed, 5);
        assert_eq!(stats.live_records, 0);
    }

    #[test]
    fn test_invalid_path_rejected() {
        let store = MetadataStore::new();
        assert!(matches!(store.create("", 0), Err(MetaError::InvalidPath { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_lookup_returns_detached_copy() {
        let store = MetadataStore::new();
        let a = store.create("/a", 0o644).unwrap();
        let b = store.create("/b", 0o644).unwrap();

        let mut copy = store.lookup("/b").unwrap();
        copy.inode = a;
        copy.path = "/elsewhere".into();

        let stored = store.lookup("/b").unwrap();
        assert_eq!(stored.inode, b);
        assert_eq!(stored.path, "/b");
        assert_ne!(store.lookup("/a").unwrap().inode, stored.inode);
        assert!(stored.blocks().is_empty());
    }

    #[test]
    fn test_create_as_owner() {
        let store = MetadataStore::new();
        store
            .create_as("/home/u/f", 0o640, Owner { uid: 1000, gid: 100 })
            .unwrap();
        let rec = store.lookup("/home/u/f").unwrap();
        assert_eq!((rec.uid, rec.gid), (1000, 100));
    }
}
