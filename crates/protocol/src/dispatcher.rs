//! Request dispatch.
//!
//! The dispatcher is stateless per request: it decodes the envelope, runs
//! one handler against the store, and returns the response. Handlers touch
//! either the metadata store or the node registry, never both, and never
//! perform I/O.

use std::sync::Arc;
use std::time::Instant;

use corelib::registry::NodeRegistry;
use metadata::{MetaError, MetadataStore};
use replication::{ReplicaPlacement, ReplicationError, ReplicationStrategy, SimpleStrategy};
use tracing::debug;

use crate::codec;
use crate::error::ErrorCode;
use crate::message::{Envelope, MessageType, Request, Response};

/// Routes envelopes to handlers over shared server state.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<MetadataStore>,
    registry: Arc<NodeRegistry>,
    strategy: Arc<dyn ReplicationStrategy>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<MetadataStore>,
        registry: Arc<NodeRegistry>,
        strategy: Arc<dyn ReplicationStrategy>,
    ) -> Self {
        Self {
            store,
            registry,
            strategy,
        }
    }

    /// A dispatcher over fresh, empty state with three-way replication.
    pub fn standalone() -> Self {
        Self::new(
            Arc::new(MetadataStore::new()),
            Arc::new(NodeRegistry::default()),
            Arc::new(SimpleStrategy::default()),
        )
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn strategy(&self) -> &Arc<dyn ReplicationStrategy> {
        &self.strategy
    }

    /// Handles one envelope.
    pub fn dispatch(&self, envelope: &Envelope) -> Response {
        // Ping never waits on shared state.
        if envelope.msg_type == MessageType::Ping.as_u16() {
            record("ping", "ok");
            return Response::Pong;
        }

        let started = Instant::now();
        let response = match codec::decode_request(envelope) {
            Ok(request) => self.handle(request),
            Err(code) => Response::Error(code),
        };

        let op = op_name(envelope.msg_type);
        let outcome = match &response {
            Response::Error(_) => "error",
            _ => "ok",
        };
        record(op, outcome);
        metrics::histogram!("distfs_meta_request_seconds", "op" => op)
            .record(started.elapsed().as_secs_f64());
        debug!(
            msg_type = format_args!("0x{:04X}", envelope.msg_type),
            length = envelope.length,
            %response,
            "dispatched request"
        );
        response
    }

    fn handle(&self, request: Request) -> Response {
        match request {
            Request::CreateFile { path, mode } => match self.store.create(&path, mode) {
                Ok(_) => Response::ok(),
                Err(err) => Response::Error(map_meta_error(err, ErrorCode::NotFound)),
            },
            Request::OpenFile { path, flags } => match self.store.lookup(&path) {
                Ok(record) => {
                    debug!(%path, flags, inode = record.inode, "opened file");
                    Response::with_inode(record.inode)
                }
                Err(err) => Response::Error(map_meta_error(err, ErrorCode::FileNotFound)),
            },
            Request::DeleteFile { path } => match self.store.remove(&path) {
                Ok(_) => Response::ok(),
                Err(err) => Response::Error(map_meta_error(err, ErrorCode::NotFound)),
            },
            Request::Ping => Response::Pong,
        }
    }

    /// Storage nodes that should hold the data of `path`, primary first.
    ///
    /// Only the registry is consulted; the store is not touched.
    pub fn placement(&self, path: &str) -> Result<ReplicaPlacement, ReplicationError> {
        self.strategy.place(&self.registry, path.as_bytes())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("records", &self.store.len())
            .field("nodes", &self.registry.len())
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

/// Maps a store error to its wire code. `missing` is the code used for an
/// absent path, which differs between open and delete.
fn map_meta_error(err: MetaError, missing: ErrorCode) -> ErrorCode {
    match err {
        MetaError::FileExists(_) => ErrorCode::FileExists,
        MetaError::NotFound(_) => missing,
        MetaError::InvalidPath { .. } => ErrorCode::InvalidParam,
        MetaError::NoMemory { .. } => ErrorCode::NoMemory,
    }
}

fn op_name(tag: u16) -> &'static str {
    match MessageType::from_u16(tag) {
        Some(MessageType::CreateFile) => "create",
        Some(MessageType::OpenFile) => "open",
        Some(MessageType::DeleteFile) => "delete",
        Some(MessageType::Ping) => "ping",
        _ => "unsupported",
    }
}

fn record(op: &'static str, outcome: &'static str) {
    metrics::counter!("distfs_meta_requests_total", "op" => op, "outcome" => outcome).increment(1);
}
