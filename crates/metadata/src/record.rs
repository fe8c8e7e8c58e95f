//! File records held by the metadata store.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, Result};

/// Maximum number of data blocks tracked per file.
pub const MAX_BLOCKS: usize = 16;

/// Maximum path length in bytes, excluding the NUL terminator used on the wire.
pub const MAX_PATH_LEN: usize = 4095;

/// Owner identity stamped on new records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    /// uid/gid 0. No caller identity reaches the store yet, so every record
    /// created through the request path is owned by root.
    pub const ROOT: Owner = Owner { uid: 0, gid: 0 };
}

/// Metadata for one file, keyed by its path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub inode: u64,
    pub path: String,
    pub size: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
    pub nlinks: u32,
    blocks: [u64; MAX_BLOCKS],
    block_count: u32,
}

impl FileRecord {
    /// A fresh, empty file with one link and all timestamps set to `now`.
    pub fn new(inode: u64, path: String, mode: u32, owner: Owner, now: u64) -> Self {
        Self {
            inode,
            path,
            size: 0,
            mode,
            uid: owner.uid,
            gid: owner.gid,
            atime: now,
            mtime: now,
            ctime: now,
            nlinks: 1,
            blocks: [0; MAX_BLOCKS],
            block_count: 0,
        }
    }

    /// Data block ids, at most `MAX_BLOCKS`.
    pub fn blocks(&self) -> &[u64] {
        &self.blocks[..self.block_count as usize]
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }
}

/// Checks a path before it becomes a store key.
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(MetaError::InvalidPath { reason: "empty path" });
    }
    if path.len() > MAX_PATH_LEN {
        return Err(MetaError::InvalidPath { reason: "path too long" });
    }
    if path.as_bytes().contains(&0) {
        return Err(MetaError::InvalidPath { reason: "path contains NUL" });
    }
    Ok(())
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
