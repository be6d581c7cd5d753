//! Wire framing for requests and responses
//!
//! Every message travels as one self-delimited frame:
//!
//! ```text
//! [u32 BE: payload length][bincode payload of that length]
//! ```
//!
//! The payload uses fixed-width integers and rejects trailing bytes, so a
//! frame either decodes to exactly one message or fails.

use crate::{Request, Response};
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const HEADER_LEN: usize = 4;

/// Largest request payload a server will accept.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Largest payload the length header can announce.
pub const MAX_RESPONSE_LEN: usize = u32::MAX as usize;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated frame: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    #[error("frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    #[error("malformed payload: {0}")]
    Malformed(#[source] bincode::Error),

    #[error("{extra} bytes trail the frame")]
    TrailingBytes { extra: usize },

    #[error("failed to encode message: {0}")]
    Encode(#[source] bincode::Error),
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for crate::Request {}
    impl Sealed for crate::Response {}
}

/// A message kind that may be framed onto the wire.
pub trait WireMessage: Serialize + DeserializeOwned + sealed::Sealed {
    /// Largest payload accepted for this kind of message.
    const MAX_LEN: usize;
}

/// Requests arrive from unauthenticated peers, so their size is capped.
impl WireMessage for Request {
    const MAX_LEN: usize = MAX_FRAME_LEN;
}

/// Responses carry whole store snapshots and may use the full header range.
impl WireMessage for Response {
    const MAX_LEN: usize = MAX_RESPONSE_LEN;
}

fn wire_options(limit: usize) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(limit as u64)
        .reject_trailing_bytes()
}

fn check_len<M: WireMessage>(len: usize) -> Result<(), CodecError> {
    if len > M::MAX_LEN {
        return Err(CodecError::FrameTooLarge {
            len,
            max: M::MAX_LEN,
        });
    }
    Ok(())
}

/// Encodes a message into a complete frame, header included.
pub fn encode<M: WireMessage>(message: &M) -> Result<Vec<u8>, CodecError> {
    let payload = wire_options(M::MAX_LEN)
        .serialize(message)
        .map_err(CodecError::Encode)?;
    check_len::<M>(payload.len())?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes exactly one frame.
pub fn decode<M: WireMessage>(bytes: &[u8]) -> Result<M, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            needed: HEADER_LEN,
            got: bytes.len(),
        });
    }

    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&bytes[..HEADER_LEN]);
    let len = u32::from_be_bytes(header) as usize;
    check_len::<M>(len)?;

    let needed = HEADER_LEN + len;
    if bytes.len() < needed {
        return Err(CodecError::Truncated {
            needed,
            got: bytes.len(),
        });
    }
    if bytes.len() > needed {
        return Err(CodecError::TrailingBytes {
            extra: bytes.len() - needed,
        });
    }

    decode_payload(&bytes[HEADER_LEN..])
}

fn decode_payload<M: WireMessage>(payload: &[u8]) -> Result<M, CodecError> {
    wire_options(M::MAX_LEN)
        .deserialize(payload)
        .map_err(CodecError::Malformed)
}

/// Reads the next frame from a stream.
///
/// Returns `None` when the peer closed the stream before a new frame began.
/// A stream that ends partway through a frame is `Truncated`.
pub async fn read_message<M, R>(reader: &mut R) -> Result<Option<M>, CodecError>
where
    M: WireMessage,
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let mut got = 0;
    while got < HEADER_LEN {
        let n = reader.read(&mut header[got..]).await?;
        if n == 0 {
            if got == 0 {
                return Ok(None);
            }
            return Err(CodecError::Truncated {
                needed: HEADER_LEN,
                got,
            });
        }
        got += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    check_len::<M>(len)?;

    // Grows with the bytes that actually arrive, not with the announced length
    let mut payload = Vec::new();
    (&mut *reader)
        .take(len as u64)
        .read_to_end(&mut payload)
        .await?;
    if payload.len() < len {
        return Err(CodecError::Truncated {
            needed: HEADER_LEN + len,
            got: HEADER_LEN + payload.len(),
        });
    }

    decode_payload(&payload).map(Some)
}

/// Writes one frame and flushes it.
pub async fn write_message<M, W>(writer: &mut W, message: &M) -> Result<(), CodecError>
where
    M: WireMessage,
    W: AsyncWrite + Unpin,
{
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
