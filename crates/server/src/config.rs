//! Server configuration.
//!
//! Values come from defaults, then an optional JSON file, then command-line
//! flags, each layer overriding the previous one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use corelib::partitioner::PartitionerKind;
use corelib::StorageNode;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

pub const DEFAULT_PORT: u16 = 9527;
pub const DEFAULT_MAX_CONNECTIONS: usize = 1000;
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_REPLICAS: usize = 3;

/// A storage node known at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedNode {
    pub node_id: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub capacity: u64,
}

impl SeedNode {
    pub fn to_storage_node(&self) -> StorageNode {
        StorageNode::new(self.node_id.as_str(), self.address.as_str(), self.port, self.capacity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    pub max_connections: usize,
    pub worker_pool_size: usize,
    /// Virtual nodes per storage node on the hash ring.
    pub virtual_nodes: usize,
    pub replica_count: usize,
    pub partitioner: PartitionerKind,
    pub heartbeat_interval_secs: u64,
    /// Nodes silent for longer than this are marked inactive.
    pub node_timeout_secs: u64,
    pub seed_nodes: Vec<SeedNode>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: String::from("0.0.0.0"),
            listen_port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            worker_pool_size: DEFAULT_WORKERS,
            virtual_nodes: corelib::ring::DEFAULT_VNODES,
            replica_count: DEFAULT_REPLICAS,
            partitioner: PartitionerKind::default(),
            heartbeat_interval_secs: 10,
            node_timeout_secs: 30,
            seed_nodes: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, u64); 6] = [
            ("worker_pool_size", self.worker_pool_size as u64),
            ("max_connections", self.max_connections as u64),
            ("virtual_nodes", self.virtual_nodes as u64),
            ("replica_count", self.replica_count as u64),
            ("heartbeat_interval_secs", self.heartbeat_interval_secs),
            ("node_timeout_secs", self.node_timeout_secs),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ServerError::Config(format!("{} must be greater than 0", name)));
            }
        }
        if self.listen_address.is_empty() {
            return Err(ServerError::Config("listen_address is empty".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_address, self.listen_port)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_secs)
    }
}

/// Command-line flags of the `metaserver` binary.
#[derive(Debug, Parser)]
#[command(name = "metaserver", version, about = "DistFS metadata server")]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Listen address
    #[arg(long)]
    pub address: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Virtual nodes per storage node
    #[arg(long)]
    pub vnodes: Option<usize>,

    /// Default replica count
    #[arg(long)]
    pub replicas: Option<usize>,

    /// Worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long)]
    pub max_connections: Option<usize>,
}

impl Args {
    /// Loads the config file, if any, and applies flag overrides.
    pub fn load_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        if let Some(address) = &self.address {
            config.listen_address = address.clone();
        }
        if let Some(vnodes) = self.vnodes {
            config.virtual_nodes = vnodes;
        }
        if let Some(replicas) = self.replicas {
            config.replica_count = replicas;
        }
        if let Some(workers) = self.workers {
            config.worker_pool_size = workers;
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
    }
}
