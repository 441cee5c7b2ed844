//! WA8DED hostmode protocol core
//!
//! Frame layout, response types, link state decoding and the error type.

mod codec;
mod error;
mod header;
mod link;
mod types;

pub use codec::{encode, encode_command, take_chunk};
pub use error::{Error, Result};
pub use header::{FrameHeader, ResponseHeader};
pub use link::{
    LinkState, STATE_CONNECTED, STATE_DISCONNECT, STATE_IDLE, STATE_LINK_SETUP, TxReadiness,
    decode_status,
};
pub use types::{BodyFormat, FrameKind, ResponseType};

/// Channel used for the PACTOR link
pub const PACTOR_CHANNEL: u8 = 4;

/// Channel 0 addresses the modem itself (used to leave hostmode)
pub const CONTROL_CHANNEL: u8 = 0;

/// Largest payload the modem accepts in one data frame
pub const MAX_PAYLOAD_SIZE: usize = 254;

/// Largest body the 1-byte length field can describe
pub const MAX_FRAME_BODY: usize = 256;

/// Response header size in bytes
pub const RESPONSE_HEADER_SIZE: usize = 2;

/// Poll for pending events
pub const CMD_POLL: &str = "G";

/// Query link status
pub const CMD_LINK_STATUS: &str = "L";

/// Disconnect the link
pub const CMD_DISCONNECT: &str = "D";

/// Leave hostmode (sent on [`CONTROL_CHANNEL`])
pub const CMD_LEAVE_HOSTMODE: &str = "JHOST0";

/// Enter hostmode (line mode command, echoed back)
pub const CMD_ENTER_HOSTMODE: &str = "JHOST1";

/// Build the connect command for `remote`
#[must_use]
pub fn connect_command(remote: &str) -> String {
    format!("C {remote}")
}
