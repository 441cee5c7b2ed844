//! Hostmode frame encoding
//!
//! Outbound frames are built in one contiguous buffer so the whole frame
//! reaches the serial line in a single write.

use bytes::{BufMut, Bytes, BytesMut};

use super::{FrameHeader, FrameKind, MAX_PAYLOAD_SIZE, Result};

/// Encode a frame
///
/// # Format
///
/// ```text
/// [channel (1)] [kind (1)] [len - 1 (1)] [body (len)]
/// ```
pub fn encode(channel: u8, kind: FrameKind, body: &[u8]) -> Result<Bytes> {
    let header = FrameHeader::new(channel, kind, body.len())?;
    let mut bytes = BytesMut::with_capacity(3 + body.len());
    bytes.put_slice(&header.to_bytes());
    bytes.put_slice(body);
    Ok(bytes.freeze())
}

/// Encode a control command such as `G`, `L` or `C N0CALL`
pub fn encode_command(channel: u8, command: &str) -> Result<Bytes> {
    encode(channel, FrameKind::Command, command.as_bytes())
}

/// Detach the next transmittable slice from the front of `buffer`
///
/// Returns at most [`MAX_PAYLOAD_SIZE`] bytes; the rest stays queued.
pub fn take_chunk(buffer: &mut BytesMut) -> Bytes {
    let take = buffer.len().min(MAX_PAYLOAD_SIZE);
    buffer.split_to(take).freeze()
}
