//! Length-prefixed codec for the command channel
//!
//! All messages are framed as:
//! ```text
//! [ 4 bytes: length (u32, big-endian) ][ N bytes: protobuf message ]
//! ```
//!
//! Framing is untyped: the decoder yields raw payload bytes and the caller
//! decodes them as whichever message the channel direction carries
//! (`CommandRequest` inbound, `CommandReply` outbound).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;
use thiserror::Error;

/// Maximum message size (1 MB); control-plane messages are small
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Message too large: {0} bytes (max: {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),

    #[error("Invalid message length prefix: {0}")]
    InvalidLength(u32),

    #[error("Protobuf decode error: {0}")]
    DecodeError(#[from] prost::DecodeError),

    #[error("Protobuf encode error: {0}")]
    EncodeError(#[from] prost::EncodeError),
}

/// Encode a message into a complete length-prefixed frame
pub fn encode<M: Message>(message: &M) -> Result<Bytes, CodecError> {
    let msg_len = message.encoded_len();

    if msg_len > MAX_MESSAGE_SIZE as usize {
        return Err(CodecError::MessageTooLarge(msg_len));
    }

    let mut buf = BytesMut::with_capacity(4 + msg_len);

    // Length prefix (big-endian u32), then the protobuf bytes
    buf.put_u32(msg_len as u32);
    message.encode(&mut buf)?;

    Ok(buf.freeze())
}

/// Try to split one length-prefixed frame off the front of a buffer
///
/// Returns:
/// - `Ok(Some(payload))` if a complete frame was available
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the length prefix is invalid
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Bytes>, CodecError> {
    // Need at least 4 bytes for the length prefix
    if buf.len() < 4 {
        return Ok(None);
    }

    // Peek at the length prefix without consuming
    let msg_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);

    if msg_len > MAX_MESSAGE_SIZE {
        return Err(CodecError::InvalidLength(msg_len));
    }

    let total_len = 4 + msg_len as usize;
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(4);
    let payload = buf.split_to(msg_len as usize).freeze();

    Ok(Some(payload))
}

/// Decode a de-framed payload as the given message type
pub fn decode_payload<M: Message + Default>(payload: &[u8]) -> Result<M, CodecError> {
    Ok(M::decode(payload)?)
}

/// Decoder state machine for streaming decoding
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Partial frame data being accumulated
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a new frame decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to split the next complete frame payload from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all
    /// complete frames
    pub fn decode_next(&mut self) -> Result<Option<Bytes>, CodecError> {
        decode_frame(&mut self.buffer)
    }
}
