//! Hostmode frame headers
//!
//! Outbound frames carry a 3-byte header, inbound responses a 2-byte one.

use super::{Error, FrameKind, MAX_FRAME_BODY, ResponseType, Result};

/// Outbound frame header
///
/// # Wire Format
///
/// ```text
/// +---------+---------+-----------+----------------------+
/// | channel |  kind   |  len - 1  |  body (len bytes)    |
/// +---------+---------+-----------+----------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    channel: u8,
    kind: FrameKind,
    len_minus_one: u8,
}

impl FrameHeader {
    /// Build a header for a body of `body_len` bytes
    pub fn new(channel: u8, kind: FrameKind, body_len: usize) -> Result<Self> {
        if body_len == 0 || body_len > MAX_FRAME_BODY {
            return Err(Error::InvalidFrame { len: body_len });
        }
        let len_minus_one = u8::try_from(body_len - 1).map_err(|_| Error::InvalidFrame {
            len: body_len,
        })?;
        Ok(Self {
            channel,
            kind,
            len_minus_one,
        })
    }

    /// Channel the frame addresses
    #[must_use]
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// Command or data
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Length of the body that follows
    #[must_use]
    pub const fn body_len(&self) -> usize {
        self.len_minus_one as usize + 1
    }

    /// Convert to bytes
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; 3] {
        [self.channel, self.kind.as_u8(), self.len_minus_one]
    }
}

/// Inbound response header: `[channel][type]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    channel: u8,
    code: u8,
}

impl ResponseHeader {
    /// Create a header from raw parts
    #[must_use]
    pub const fn new(channel: u8, code: u8) -> Self {
        Self { channel, code }
    }

    /// Parse from the first two bytes of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [channel, code, ..] => Ok(Self::new(*channel, *code)),
            _ => Err(Error::Timeout {
                expected: 2,
                received: bytes.len(),
            }),
        }
    }

    /// Channel the response belongs to
    #[must_use]
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// Raw response type byte
    #[must_use]
    pub const fn code(&self) -> u8 {
        self.code
    }

    /// Decoded response type, `None` for codes the driver does not know
    #[must_use]
    pub fn response_type(&self) -> Option<ResponseType> {
        ResponseType::from_u8(self.code)
    }

    /// Whether this acknowledges a data frame sent on `channel`
    #[must_use]
    pub const fn acknowledges(&self, channel: u8) -> bool {
        self.channel == channel && self.code == ResponseType::Ok.as_u8()
    }
}
