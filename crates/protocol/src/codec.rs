//! Payload codecs.
//!
//! Request payloads have fixed little-endian layouts:
//!
//! ```text
//! CreateFile  path[4096] (NUL-terminated UTF-8) | mode  u32   = 4100 bytes
//! OpenFile    path[4096] (NUL-terminated UTF-8) | flags i32   = 4100 bytes
//! DeleteFile  path bytes, optionally NUL-terminated           >= 1 byte
//! Ping        (empty)
//! ```
//!
//! Every field is read through a bounds-checked slice into an owned value.
//! A payload shorter than its layout is rejected before any field is read.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ErrorCode, ProtocolError};
use crate::message::{Envelope, MessageType, Request, Response};

/// Size of the fixed path field in create/open payloads.
pub const PATH_FIELD_LEN: usize = 4096;

/// Size of a `CreateFile` payload.
pub const CREATE_FILE_LEN: usize = PATH_FIELD_LEN + 4;

/// Size of an `OpenFile` payload.
pub const OPEN_FILE_LEN: usize = PATH_FIELD_LEN + 4;

/// Decodes an envelope into a typed request.
///
/// Errors are the codes to send back: unknown tags are
/// `UnsupportedOperation`, everything malformed is `InvalidParam`.
pub fn decode_request(envelope: &Envelope) -> Result<Request, ErrorCode> {
    let kind = match envelope.kind() {
        Some(MessageType::CreateFile) => MessageType::CreateFile,
        Some(MessageType::OpenFile) => MessageType::OpenFile,
        Some(MessageType::DeleteFile) => MessageType::DeleteFile,
        Some(MessageType::Ping) => return Ok(Request::Ping),
        _ => return Err(ErrorCode::UnsupportedOperation),
    };

    let payload = &envelope.payload[..];
    if envelope.length as usize != payload.len() {
        return Err(ErrorCode::InvalidParam);
    }

    match kind {
        MessageType::CreateFile => {
            let (path, mut rest) = split_path_field(payload, CREATE_FILE_LEN)?;
            Ok(Request::CreateFile {
                path,
                mode: rest.get_u32_le(),
            })
        }
        MessageType::OpenFile => {
            let (path, mut rest) = split_path_field(payload, OPEN_FILE_LEN)?;
            Ok(Request::OpenFile {
                path,
                flags: rest.get_i32_le(),
            })
        }
        _ => {
            if payload.is_empty() {
                return Err(ErrorCode::InvalidParam);
            }
            let end = payload.iter().position(|b| *b == 0).unwrap_or(payload.len());
            Ok(Request::DeleteFile {
                path: owned_path(&payload[..end])?,
            })
        }
    }
}

/// Checks `payload` against a layout of `expected` bytes that starts with
/// the path field, and returns the path plus the remaining fixed fields.
fn split_path_field(payload: &[u8], expected: usize) -> Result<(String, &[u8]), ErrorCode> {
    if payload.len() < expected {
        return Err(ErrorCode::InvalidParam);
    }
    let (field, rest) = payload.split_at(PATH_FIELD_LEN);
    let end = field
        .iter()
        .position(|b| *b == 0)
        .ok_or(ErrorCode::InvalidParam)?;
    Ok((owned_path(&field[..end])?, &rest[..expected - PATH_FIELD_LEN]))
}

fn owned_path(raw: &[u8]) -> Result<String, ErrorCode> {
    if raw.is_empty() {
        return Err(ErrorCode::InvalidParam);
    }
    let path = std::str::from_utf8(raw).map_err(|_| ErrorCode::InvalidParam)?;
    let mut owned = String::new();
    owned
        .try_reserve_exact(path.len())
        .map_err(|_| ErrorCode::NoMemory)?;
    owned.push_str(path);
    Ok(owned)
}

/// Encodes a request into an envelope using the fixed layouts.
///
/// Paths longer than the path field (minus the terminator) are rejected.
pub fn encode_request(request: &Request) -> Result<Envelope, ErrorCode> {
    let tag = request.message_type().as_u16();
    let payload = match request {
        Request::CreateFile { path, mode } => {
            let mut buf = path_field(path, CREATE_FILE_LEN)?;
            buf.put_u32_le(*mode);
            buf.freeze()
        }
        Request::OpenFile { path, flags } => {
            let mut buf = path_field(path, OPEN_FILE_LEN)?;
            buf.put_i32_le(*flags);
            buf.freeze()
        }
        Request::DeleteFile { path } => {
            if path.is_empty() {
                return Err(ErrorCode::InvalidParam);
            }
            let mut buf = BytesMut::with_capacity(path.len() + 1);
            buf.put_slice(path.as_bytes());
            buf.put_u8(0);
            buf.freeze()
        }
        Request::Ping => Bytes::new(),
    };
    Ok(Envelope::new(tag, payload))
}

fn path_field(path: &str, total: usize) -> Result<BytesMut, ErrorCode> {
    if path.is_empty() || path.len() >= PATH_FIELD_LEN {
        return Err(ErrorCode::InvalidParam);
    }
    let mut buf = BytesMut::with_capacity(total);
    buf.put_slice(path.as_bytes());
    buf.put_bytes(0, PATH_FIELD_LEN - path.len());
    Ok(buf)
}

/// Encodes a response into an envelope.
pub fn encode_response(response: &Response) -> Envelope {
    let payload = match response {
        Response::Success(body) => body.clone(),
        Response::Error(code) => Bytes::copy_from_slice(&code.code().to_le_bytes()),
        Response::Pong => Bytes::new(),
    };
    Envelope::new(response.message_type().as_u16(), payload)
}

/// Decodes a response envelope (client side).
pub fn decode_response(envelope: &Envelope) -> Result<Response, ProtocolError> {
    match envelope.kind() {
        Some(MessageType::Success) => Ok(Response::Success(envelope.payload.clone())),
        Some(MessageType::Pong) => Ok(Response::Pong),
        Some(MessageType::Error) => {
            let mut body = &envelope.payload[..];
            if body.len() < 4 {
                return Err(ProtocolError::Truncated {
                    needed: 4,
                    got: body.len(),
                });
            }
            let code = body.get_i32_le();
            ErrorCode::from_code(code)
                .map(Response::Error)
                .ok_or(ProtocolError::UnknownErrorCode(code))
        }
        _ => Err(ProtocolError::UnexpectedMessage(envelope.msg_type)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_payload(path: &[u8], mode: u32) -> Vec<u8> {
        let mut raw = vec![0u8; CREATE_FILE_LEN];
        raw[..path.len()].copy_from_slice(path);
        raw[PATH_FIELD_LEN..].copy_from_slice(&mode.to_le_bytes());
        raw
    }

    #[test]
    fn test_decode_create_file() {
        let env = Envelope::new(0x0001, create_payload(b"/a.txt", 0o644));
        assert_eq!(
            decode_request(&env),
            Ok(Request::CreateFile {
                path: "/a.txt".into(),
                mode: 0o644
            })
        );
    }

    #[test]
    fn test_short_create_payload_is_invalid() {
        let mut raw = create_payload(b"/a.txt", 0o644);
        raw.truncate(CREATE_FILE_LEN - 1);
        let env = Envelope::new(0x0001, raw);
        assert_eq!(decode_request(&env), Err(ErrorCode::InvalidParam));

        let env = Envelope::new(0x0002, &b"/a.txt\0"[..]);
        assert_eq!(decode_request(&env), Err(ErrorCode::InvalidParam));
    }

    #[test]
    fn test_length_mismatch_is_invalid() {
        let mut env = Envelope::new(0x0001, create_payload(b"/a.txt", 0o644));
        env.length += 1;
        assert_eq!(decode_request(&env), Err(ErrorCode::InvalidParam));
    }

    #[test]
    fn test_unterminated_or_bad_paths() {
        let env = Envelope::new(0x0001, create_payload(&[b'x'; PATH_FIELD_LEN], 0));
        assert_eq!(decode_request(&env), Err(ErrorCode::InvalidParam));

        let env = Envelope::new(0x0001, create_payload(b"", 0));
        assert_eq!(decode_request(&env), Err(ErrorCode::InvalidParam));

        let env = Envelope::new(0x0001, create_payload(&[0xff, 0xfe], 0));
        assert_eq!(decode_request(&env), Err(ErrorCode::InvalidParam));
    }

    #[test]
    fn test_delete_accepts_raw_and_terminated_paths() {
        let env = Envelope::new(0x0006, &b"/x"[..]);
        assert_eq!(
            decode_request(&env),
            Ok(Request::DeleteFile { path: "/x".into() })
        );
        let env = Envelope::new(0x0006, &b"/x\0garbage"[..]);
        assert_eq!(
            decode_request(&env),
            Ok(Request::DeleteFile { path: "/x".into() })
        );
        assert_eq!(
            decode_request(&Envelope::new(0x0006, Bytes::new())),
            Err(ErrorCode::InvalidParam)
        );
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let env = Envelope::new(0x0003, Bytes::new());
        assert_eq!(decode_request(&env), Err(ErrorCode::UnsupportedOperation));
        // Response tags are not requests either.
        let env = Envelope::new(0x8000, Bytes::new());
        assert_eq!(decode_request(&env), Err(ErrorCode::UnsupportedOperation));
    }

    #[test]
    fn test_encode_request_layouts() {
        let env = encode_request(&Request::OpenFile {
            path: "/a".into(),
            flags: -1,
        })
        .unwrap();
        assert_eq!(env.payload.len(), OPEN_FILE_LEN);
        assert_eq!(&env.payload[OPEN_FILE_LEN - 4..], &(-1i32).to_le_bytes());
        assert_eq!(
            decode_request(&env),
            Ok(Request::OpenFile {
                path: "/a".into(),
                flags: -1
            })
        );

        let too_long = "p".repeat(PATH_FIELD_LEN);
        assert!(encode_request(&Request::CreateFile { path: too_long, mode: 0 }).is_err());
    }

    #[test]
    fn test_error_response_body() {
        let env = encode_response(&Response::Error(ErrorCode::FileExists));
        assert_eq!(env.msg_type, 0x8001);
        assert_eq!(&env.payload[..], &(-4i32).to_le_bytes());
        assert_eq!(
            decode_response(&env),
            Ok(Response::Error(ErrorCode::FileExists))
        );
    }

    #[test]
    fn test_decode_response_rejects_garbage() {
        let env = Envelope::new(0x8001, &[1u8, 2][..]);
        assert!(matches!(decode_response(&env), Err(ProtocolError::Truncated { .. })));
        let env = Envelope::new(0x0001, Bytes::new());
        assert_eq!(decode_response(&env), Err(ProtocolError::UnexpectedMessage(1)));
    }
}
