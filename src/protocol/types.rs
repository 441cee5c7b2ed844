//! Hostmode frame kinds and response types

use std::fmt;

/// Kind of an outbound frame, carried in the second header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Payload bytes for the remote station
    Data = 0x00,
    /// Control command for the modem itself
    Command = 0x01,
}

impl FrameKind {
    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// How the body following a response header is delimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// Header only
    Empty,
    /// Text terminated by a NUL byte
    NullTerminated,
    /// One length byte `n` followed by `n + 1` raw bytes
    LengthPrefixed,
}

/// Response type byte of an inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseType {
    /// Success, nothing to report
    Ok = 0x00,
    /// Success with a message
    OkMessage = 0x01,
    /// Command failed, message explains why
    ErrorMessage = 0x02,
    /// Link status text (CONNECTED, DISCONNECTED, ...)
    LinkStatus = 0x03,
    /// Monitor header without info field
    MonitorHeader = 0x04,
    /// Monitor header announcing an info field
    MonitorHeaderWithData = 0x05,
    /// Monitored info field
    MonitorData = 0x06,
    /// Connected payload for this channel
    Payload = 0x07,
}

impl ResponseType {
    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Ok),
            0x01 => Some(Self::OkMessage),
            0x02 => Some(Self::ErrorMessage),
            0x03 => Some(Self::LinkStatus),
            0x04 => Some(Self::MonitorHeader),
            0x05 => Some(Self::MonitorHeaderWithData),
            0x06 => Some(Self::MonitorData),
            0x07 => Some(Self::Payload),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Body layout following the 2-byte header
    #[must_use]
    pub const fn body_format(self) -> BodyFormat {
        match self {
            Self::Ok => BodyFormat::Empty,
            Self::OkMessage
            | Self::ErrorMessage
            | Self::LinkStatus
            | Self::MonitorHeader
            | Self::MonitorHeaderWithData => BodyFormat::NullTerminated,
            Self::MonitorData | Self::Payload => BodyFormat::LengthPrefixed,
        }
    }

    /// Check if the body belongs to the consumer
    #[must_use]
    pub const fn is_payload(self) -> bool {
        matches!(self, Self::Payload)
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "Ok",
            Self::OkMessage => "OkMessage",
            Self::ErrorMessage => "ErrorMessage",
            Self::LinkStatus => "LinkStatus",
            Self::MonitorHeader => "MonitorHeader",
            Self::MonitorHeaderWithData => "MonitorHeaderWithData",
            Self::MonitorData => "MonitorData",
            Self::Payload => "Payload",
        };
        write!(f, "{name}")
    }
}
