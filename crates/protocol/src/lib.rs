//! Metadata protocol for the DistFS metadata server.
//!
//! This crate turns bytes into responses:
//! - `frame`: the 24-byte checksummed wire header
//! - `codec`: length-checked payload layouts
//! - `message`: envelopes, requests and responses
//! - `dispatcher`: request handling over the store and registry

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod message;

pub use dispatcher::Dispatcher;
pub use error::{ErrorCode, ProtocolError};
pub use frame::{Frame, FrameHeader, HEADER_SIZE, MAGIC, MAX_PAYLOAD, VERSION};
pub use message::{Envelope, MessageType, Request, Response};
