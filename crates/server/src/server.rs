//! Metadata server lifecycle.
//!
//! A `MetadataServer` owns everything it runs on: its tokio runtime, the
//! metadata store, the node registry and the dispatcher. Several servers can
//! live in one process without sharing any state.
//!
//! `start`, `stop` and `destroy` block on the server's own runtime and must
//! be called from outside any async context.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use corelib::ring::HashRing;
use corelib::registry::NodeRegistry;
use metadata::MetadataStore;
use protocol::Dispatcher;
use replication::{ReplicaPlacement, ReplicationError, SimpleStrategy};
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::listener;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Process signal that asked the server to shut down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT or Ctrl-C.
    Interrupt,
    /// SIGTERM, as sent by service managers.
    Terminate,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_loop: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

pub struct MetadataServer {
    config: ServerConfig,
    runtime: Option<Runtime>,
    dispatcher: Dispatcher,
    running: Option<Running>,
}

impl MetadataServer {
    /// Builds a stopped server.
    ///
    /// Nothing is bound yet. On error every resource acquired so far is
    /// dropped before returning.
    pub fn create(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_pool_size)
            .thread_name("distfs-meta")
            .enable_all()
            .build()?;

        let ring = HashRing::with_partitioner(config.partitioner.build(), config.virtual_nodes);
        let registry = Arc::new(NodeRegistry::new(ring));
        for seed in &config.seed_nodes {
            registry.register(seed.to_storage_node())?;
        }

        let strategy = Arc::new(SimpleStrategy::new(config.replica_count)?);
        let dispatcher = Dispatcher::new(Arc::new(MetadataStore::new()), registry, strategy);

        info!(
            port = config.listen_port,
            workers = config.worker_pool_size,
            vnodes = config.virtual_nodes,
            replicas = config.replica_count,
            partitioner = %config.partitioner,
            seeds = config.seed_nodes.len(),
            "metadata server created"
        );

        Ok(Self {
            config,
            runtime: Some(runtime),
            dispatcher,
            running: None,
        })
    }

    /// Binds the listener and starts serving.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }
        let runtime = self.runtime.as_ref().ok_or(ServerError::NotRunning)?;

        let std_listener = std::net::TcpListener::bind(self.config.bind_addr())?;
        std_listener.set_nonblocking(true)?;
        let local_addr = std_listener.local_addr()?;
        let listener = {
            let _guard = runtime.enter();
            tokio::net::TcpListener::from_std(std_listener)?
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let accept_loop = runtime.spawn(listener::serve(
            listener,
            self.dispatcher.clone(),
            self.config.max_connections,
            shutdown_rx.clone(),
        ));
        let sweeper = runtime.spawn(sweep_stale_nodes(
            self.dispatcher.registry().clone(),
            self.config.heartbeat_interval(),
            self.config.node_timeout(),
            shutdown_rx,
        ));

        self.running = Some(Running {
            local_addr,
            shutdown,
            accept_loop,
            sweeper,
        });
        info!(%local_addr, "metadata server started");
        Ok(())
    }

    /// Stops accepting connections and waits for the background tasks.
    pub fn stop(&mut self) -> Result<()> {
        let running = self.running.take().ok_or(ServerError::NotRunning)?;
        let _ = running.shutdown.send(true);

        if let Some(runtime) = &self.runtime {
            runtime.block_on(async {
                for task in [running.accept_loop, running.sweeper] {
                    if let Err(e) = task.await {
                        warn!(error = %e, "background task ended abnormally");
                    }
                }
            });
        }
        info!(addr = %running.local_addr, "metadata server stopped");
        Ok(())
    }

    /// Stops the server if needed and releases its runtime.
    pub fn destroy(mut self) {
        self.shutdown_runtime();
    }

    fn shutdown_runtime(&mut self) {
        if self.running.is_some() {
            let _ = self.stop();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Bound address while running. Port 0 in the config resolves here.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        self.dispatcher.store()
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        self.dispatcher.registry()
    }

    /// Storage nodes for `path` using the configured replica count.
    pub fn placement(&self, path: &str) -> std::result::Result<ReplicaPlacement, ReplicationError> {
        self.dispatcher.placement(path)
    }

    /// Blocks until the process receives SIGINT or SIGTERM.
    pub fn wait_for_shutdown_signal(&self) -> Result<ShutdownSignal> {
        let runtime = self.runtime.as_ref().ok_or(ServerError::NotRunning)?;
        let signal = runtime.block_on(shutdown_signal())?;
        info!(?signal, "shutdown signal received");
        Ok(signal)
    }
}

impl Drop for MetadataServer {
    fn drop(&mut self) {
        self.shutdown_runtime();
    }
}

impl std::fmt::Debug for MetadataServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataServer")
            .field("local_addr", &self.local_addr())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Resolves on the first SIGINT or SIGTERM. Handlers are installed on the
/// first poll.
pub async fn shutdown_signal() -> std::io::Result<ShutdownSignal> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|()| ShutdownSignal::Interrupt),
            _ = terminate.recv() => Ok(ShutdownSignal::Terminate),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(ShutdownSignal::Interrupt)
    }
}

async fn sweep_stale_nodes(
    registry: Arc<NodeRegistry>,
    interval: Duration,
    timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let expired = registry.expire_stale(timeout);
                if !expired.is_empty() {
                    debug!(count = expired.len(), active = registry.active_count(), "heartbeat sweep");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
