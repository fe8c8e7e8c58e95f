//! DistFS metadata server.
//!
//! Wires the metadata store, node registry and dispatcher to a framed TCP
//! listener, and exposes the lifecycle as an owned `MetadataServer` handle.

pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod server;

pub use config::{Args, SeedNode, ServerConfig};
pub use error::{Result, ServerError};
pub use server::{MetadataServer, ShutdownSignal};
