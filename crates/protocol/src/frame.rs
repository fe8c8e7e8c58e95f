//! Wire framing.
//!
//! Each message travels as a 24-byte little-endian header followed by
//! `length` payload bytes:
//!
//! ```text
//! 0        4        6        8        12       16       20       24
//! | magic  | ver    | type   | flags  | length | seq    | cksum  |
//! ```
//!
//! The checksum is the XOR of every other header field, XORed with the
//! CRC32 of the payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::message::Envelope;

/// Header magic, "DIST".
pub const MAGIC: u32 = 0x4449_5354;
pub const VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 24;
/// Largest payload accepted on the wire (16 MiB).
pub const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: u32,
    pub version: u16,
    pub msg_type: u16,
    pub flags: u32,
    pub length: u32,
    pub sequence: u32,
    pub checksum: u32,
}

impl FrameHeader {
    /// Parses a header without validating it.
    pub fn parse(mut raw: &[u8]) -> Result<Self, ProtocolError> {
        if raw.len() < HEADER_SIZE {
            return Err(ProtocolError::Truncated {
                needed: HEADER_SIZE,
                got: raw.len(),
            });
        }
        Ok(Self {
            magic: raw.get_u32_le(),
            version: raw.get_u16_le(),
            msg_type: raw.get_u16_le(),
            flags: raw.get_u32_le(),
            length: raw.get_u32_le(),
            sequence: raw.get_u32_le(),
            checksum: raw.get_u32_le(),
        })
    }

    /// Checks magic, version and declared length.
    ///
    /// Runs before the payload is read so an oversized length never turns
    /// into an allocation.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.magic != MAGIC {
            return Err(ProtocolError::BadMagic {
                expected: MAGIC,
                got: self.magic,
            });
        }
        if self.version != VERSION {
            return Err(ProtocolError::UnsupportedVersion(self.version));
        }
        if self.length as usize > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.length as usize,
                max: MAX_PAYLOAD,
            });
        }
        Ok(())
    }

    pub fn payload_len(&self) -> usize {
        self.length as usize
    }

    fn fields_xor(&self) -> u32 {
        self.magic
            ^ u32::from(self.version)
            ^ u32::from(self.msg_type)
            ^ self.flags
            ^ self.length
            ^ self.sequence
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.magic);
        buf.put_u16_le(self.version);
        buf.put_u16_le(self.msg_type);
        buf.put_u32_le(self.flags);
        buf.put_u32_le(self.length);
        buf.put_u32_le(self.sequence);
        buf.put_u32_le(self.checksum);
    }
}

/// Checksum over the header fields and the payload.
pub fn checksum(header: &FrameHeader, payload: &[u8]) -> u32 {
    let body = if payload.is_empty() {
        0
    } else {
        crc32fast::hash(payload)
    };
    header.fields_xor() ^ body
}

/// A complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    /// Builds a frame with a correct length and checksum.
    pub fn new(msg_type: u16, sequence: u32, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let mut header = FrameHeader {
            magic: MAGIC,
            version: VERSION,
            msg_type,
            flags: 0,
            length: payload.len() as u32,
            sequence,
            checksum: 0,
        };
        header.checksum = checksum(&header, &payload);
        Self { header, payload }
    }

    /// Wraps an envelope, e.g. a response echoing a request's sequence.
    pub fn from_envelope(envelope: &Envelope, sequence: u32) -> Self {
        Self::new(envelope.msg_type, sequence, envelope.payload.clone())
    }

    /// Joins a validated header with its payload and verifies the checksum.
    pub fn from_parts(header: FrameHeader, payload: Bytes) -> Result<Self, ProtocolError> {
        header.validate()?;
        if payload.len() != header.payload_len() {
            return Err(ProtocolError::Truncated {
                needed: header.payload_len(),
                got: payload.len(),
            });
        }
        let computed = checksum(&header, &payload);
        if computed != header.checksum {
            return Err(ProtocolError::ChecksumMismatch {
                expected: header.checksum,
                computed,
            });
        }
        Ok(Self { header, payload })
    }

    /// Decodes one frame from the front of `raw`.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let header = FrameHeader::parse(raw)?;
        header.validate()?;
        let end = HEADER_SIZE + header.payload_len();
        if raw.len() < end {
            return Err(ProtocolError::Truncated {
                needed: end,
                got: raw.len(),
            });
        }
        Self::from_parts(header, Bytes::copy_from_slice(&raw[HEADER_SIZE..end]))
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        self.header.encode(&mut buf);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    /// The envelope handed to the dispatcher.
    pub fn envelope(&self) -> Envelope {
        Envelope {
            msg_type: self.header.msg_type,
            length: self.header.length,
            payload: self.payload.clone(),
        }
    }
}
