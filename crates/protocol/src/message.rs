//! Message types exchanged between the network layer and the dispatcher.

use std::fmt;

use bytes::Bytes;

use crate::error::ErrorCode;

/// Message-type tags carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    CreateFile = 0x0001,
    OpenFile = 0x0002,
    DeleteFile = 0x0006,
    Success = 0x8000,
    Error = 0x8001,
    Ping = 0xF001,
    Pong = 0xF002,
}

impl MessageType {
    pub fn from_u16(tag: u16) -> Option<Self> {
        Some(match tag {
            0x0001 => MessageType::CreateFile,
            0x0002 => MessageType::OpenFile,
            0x0006 => MessageType::DeleteFile,
            0x8000 => MessageType::Success,
            0x8001 => MessageType::Error,
            0xF001 => MessageType::Ping,
            0xF002 => MessageType::Pong,
            _ => return None,
        })
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// A decoded message as handed over by the network layer.
///
/// `msg_type` stays a raw tag so unknown types reach the dispatcher and get
/// an `UnsupportedOperation` answer instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub msg_type: u16,
    pub length: u32,
    pub payload: Bytes,
}

impl Envelope {
    /// Builds an envelope whose `length` matches the payload.
    pub fn new(msg_type: u16, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            msg_type,
            length: payload.len() as u32,
            payload,
        }
    }

    pub fn kind(&self) -> Option<MessageType> {
        MessageType::from_u16(self.msg_type)
    }
}

/// Typed request after length-checked decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    CreateFile { path: String, mode: u32 },
    OpenFile { path: String, flags: i32 },
    DeleteFile { path: String },
    Ping,
}

impl Request {
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::CreateFile { .. } => MessageType::CreateFile,
            Request::OpenFile { .. } => MessageType::OpenFile,
            Request::DeleteFile { .. } => MessageType::DeleteFile,
            Request::Ping => MessageType::Ping,
        }
    }
}

/// Response produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Success, with an optional body (the inode for `OpenFile`).
    Success(Bytes),
    Error(ErrorCode),
    Pong,
}

impl Response {
    pub fn ok() -> Self {
        Response::Success(Bytes::new())
    }

    pub fn with_inode(inode: u64) -> Self {
        Response::Success(Bytes::copy_from_slice(&inode.to_le_bytes()))
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Response::Success(_) => MessageType::Success,
            Response::Error(_) => MessageType::Error,
            Response::Pong => MessageType::Pong,
        }
    }

    /// The inode carried by an 8-byte success body.
    pub fn inode(&self) -> Option<u64> {
        match self {
            Response::Success(body) if body.len() == 8 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(body);
                Some(u64::from_le_bytes(raw))
            }
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Success(body) if body.is_empty() => write!(f, "Success"),
            Response::Success(body) => write!(f, "Success({} bytes)", body.len()),
            Response::Error(code) => write!(f, "Error({})", code.code()),
            Response::Pong => write!(f, "Pong"),
        }
    }
}
