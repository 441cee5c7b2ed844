//! Link state decoding from `L` (link status) responses
//!
//! The modem answers `L` with a NUL-terminated line of counters whose last
//! character is the link state digit.

use std::fmt;

/// Raw code for "no link"
pub const STATE_IDLE: i32 = 0;
/// Raw code for "link setup in progress"
pub const STATE_LINK_SETUP: i32 = 1;
/// Raw code for "disconnect requested / link lost"
pub const STATE_DISCONNECT: i32 = 3;
/// Raw code for "connected, ready to take data"
pub const STATE_CONNECTED: i32 = 4;

/// Interpreted link state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// No link, waiting
    Idle,
    /// Call issued, modem negotiating
    LinkSetup,
    /// Remote or modem ended the link
    DisconnectRequested,
    /// Link established
    Connected,
    /// Any other code; the modem is busy with something
    Busy(i32),
}

impl LinkState {
    /// Interpret a raw state code
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            STATE_IDLE => Self::Idle,
            STATE_LINK_SETUP => Self::LinkSetup,
            STATE_DISCONNECT => Self::DisconnectRequested,
            STATE_CONNECTED => Self::Connected,
            other => Self::Busy(other),
        }
    }

    /// Raw state code
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Idle => STATE_IDLE,
            Self::LinkSetup => STATE_LINK_SETUP,
            Self::DisconnectRequested => STATE_DISCONNECT,
            Self::Connected => STATE_CONNECTED,
            Self::Busy(code) => code,
        }
    }

    /// Whether the session must end when this state is observed
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::DisconnectRequested)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::LinkSetup => write!(f, "link setup"),
            Self::DisconnectRequested => write!(f, "disconnect requested"),
            Self::Connected => write!(f, "connected"),
            Self::Busy(code) => write!(f, "busy ({code})"),
        }
    }
}

/// Whether a data frame may be sent right now
///
/// Uses the same status digit as [`LinkState`] but reads it differently:
/// only `4` means "send now", and `0`, `1` and `3` all mean the link is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxReadiness {
    /// No link to send on
    NoLink,
    /// Modem accepts the next slice
    Ready,
    /// Modem is still transmitting, poll again next cycle
    Busy,
}

impl TxReadiness {
    /// Interpret a raw state code for transmission
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            STATE_IDLE | STATE_LINK_SETUP | STATE_DISCONNECT => Self::NoLink,
            STATE_CONNECTED => Self::Ready,
            _ => Self::Busy,
        }
    }
}

/// Decode the state code from the body of an `L` response
///
/// The code is the last character minus `'0'`. Returns `None` for an empty
/// body.
#[must_use]
pub fn decode_status(body: &[u8]) -> Option<i32> {
    body.last().map(|&c| i32::from(c) - i32::from(b'0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_status_uses_last_character() {
        assert_eq!(decode_status(b"0 0 0 0 0 4"), Some(4));
        assert_eq!(decode_status(b"1"), Some(1));
        assert_eq!(decode_status(b"0 0 0 0 0 3"), Some(3));
        assert_eq!(decode_status(b""), None);
    }

    #[test]
    fn test_link_state_mapping() {
        assert_eq!(LinkState::from_code(0), LinkState::Idle);
        assert_eq!(LinkState::from_code(1), LinkState::LinkSetup);
        assert_eq!(LinkState::from_code(3), LinkState::DisconnectRequested);
        assert_eq!(LinkState::from_code(4), LinkState::Connected);
        assert_eq!(LinkState::from_code(2), LinkState::Busy(2));
        assert!(LinkState::from_code(3).is_terminal());
        assert!(!LinkState::from_code(4).is_terminal());
    }

    #[test]
    fn test_tx_readiness_mapping() {
        assert_eq!(TxReadiness::from_code(0), TxReadiness::NoLink);
        assert_eq!(TxReadiness::from_code(1), TxReadiness::NoLink);
        assert_eq!(TxReadiness::from_code(3), TxReadiness::NoLink);
        assert_eq!(TxReadiness::from_code(4), TxReadiness::Ready);
        assert_eq!(TxReadiness::from_code(2), TxReadiness::Busy);
        assert_eq!(TxReadiness::from_code(7), TxReadiness::Busy);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The decoded code is the last byte minus ASCII '0', whatever precedes it
            #[test]
            fn prop_decode_is_last_char_minus_zero(prefix in prop::collection::vec(any::<u8>(), 0..32), c in any::<u8>()) {
                let mut body = prefix;
                body.push(c);
                let code = decode_status(&body).unwrap();
                prop_assert_eq!(code, i32::from(c) - 48);
                prop_assert_eq!(LinkState::from_code(code).code(), code);
            }
        }
    }
}
