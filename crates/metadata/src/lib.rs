//! In-memory file metadata for the DistFS metadata server.
//!
//! - `record`: the per-file record and path rules
//! - `inode`: lock-free inode allocation
//! - `store`: the concurrent path -> record index
//!
//! Nothing here is persisted; a restart starts from an empty store with the
//! inode counter back at 1.

pub mod error;
pub mod inode;
pub mod record;
pub mod store;

pub use error::{MetaError, Result};
pub use inode::InodeAllocator;
pub use record::{FileRecord, Owner, MAX_BLOCKS, MAX_PATH_LEN};
pub use store::{MetadataStore, StoreStats};
