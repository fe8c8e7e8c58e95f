//! TCP accept loop and per-connection frame handling.
//!
//! Each accepted connection runs in its own task and processes frames one at
//! a time: read a header, validate it, read the payload, dispatch, write the
//! response with the request's sequence number. Frames that fail validation
//! close the connection, since the stream can no longer be trusted to be in
//! sync.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use protocol::codec::encode_response;
use protocol::{Dispatcher, Frame, FrameHeader, HEADER_SIZE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

/// Accepts connections until `shutdown` flips to `true`.
///
/// Connections beyond `max_connections` are closed as soon as they are
/// accepted.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Dispatcher,
    max_connections: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let slots = Arc::new(Semaphore::new(max_connections));
    let local = listener.local_addr().ok();
    info!(addr = ?local, max_connections, "accepting connections");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let permit = match slots.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(%peer, max_connections, "connection limit reached, closing");
                        drop(stream);
                        metrics::counter!("distfs_meta_connections_rejected_total").increment(1);
                        continue;
                    }
                };
                let dispatcher = dispatcher.clone();
                let shutdown = shutdown.clone();
                metrics::counter!("distfs_meta_connections_total").increment(1);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer, dispatcher, shutdown).await {
                        debug!(%peer, error = %e, "connection closed with error");
                    }
                    drop(permit);
                });
            }
        }
    }
    info!(addr = ?local, "listener stopped");
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Dispatcher,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    stream.set_nodelay(true)?;
    debug!(%peer, "connection opened");

    loop {
        let mut raw = [0u8; HEADER_SIZE];
        tokio::select! {
            read = stream.read_exact(&mut raw) => match read {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!(%peer, "connection closed by peer");
                    return Ok(());
                }
                Err(e) => return Err(e),
            },
            _ = shutdown.changed() => return Ok(()),
        }

        let header = match FrameHeader::parse(&raw).and_then(|h| h.validate().map(|_| h)) {
            Ok(header) => header,
            Err(e) => {
                warn!(%peer, error = %e, "rejected frame header");
                return Ok(());
            }
        };

        let mut payload = BytesMut::zeroed(header.payload_len());
        stream.read_exact(&mut payload).await?;

        let frame = match Frame::from_parts(header, payload.freeze()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%peer, error = %e, sequence = header.sequence, "rejected frame");
                return Ok(());
            }
        };

        let response = dispatcher.dispatch(&frame.envelope());
        let reply = Frame::from_envelope(&encode_response(&response), frame.sequence());
        stream.write_all(&reply.encode()).await?;
    }
}
