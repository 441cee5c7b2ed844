//! PTC driver error types

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// PTC hostmode errors
///
/// The type is `Clone` because a session keeps its first fatal error and
/// hands the same value to every later caller.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The serial device node disappeared (unplugged, bluetooth link dropped)
    #[error("serial device {} vanished", .path.display())]
    DeviceVanished {
        /// Path of the device that is gone
        path: PathBuf,
    },

    /// The serial read deadline passed before the expected bytes arrived
    #[error("timeout while reading {expected} bytes (got {received})")]
    Timeout {
        /// Number of bytes the caller asked for
        expected: usize,
        /// Number of bytes that arrived in time
        received: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(Arc<io::Error>),

    /// Serial port could not be opened or configured
    #[error("serial port error: {0}")]
    Serial(String),

    /// A line-mode setup command was not answered with the expected prompt
    #[error("device setup failed at {command:?}")]
    Setup {
        /// The command that went unanswered
        command: String,
        /// What went wrong while waiting for the prompt
        #[source]
        source: Box<Error>,
    },

    /// The modem did not echo the hostmode entry command
    #[error("cannot set PTC into WA8DED hostmode")]
    Hostmode,

    /// Init script could not be read
    #[error("cannot read init script {}: {source}", .path.display())]
    Script {
        /// Script location
        path: PathBuf,
        /// Underlying read failure
        source: Arc<io::Error>,
    },

    /// Frame body does not fit the 1-byte length field
    #[error("invalid frame length: {len} bytes (must be 1..=256)")]
    InvalidFrame {
        /// Offending body length
        len: usize,
    },

    /// The outbound call never reached the connected state
    #[error("cannot link to {remote} (link state {state})")]
    CannotLink {
        /// Station that was called
        remote: String,
        /// Last link state observed
        state: i32,
    },

    /// The link dropped while outbound data was still buffered
    #[error("link lost with {discarded} bytes still buffered")]
    LinkLost {
        /// Bytes thrown away with the buffer
        discarded: usize,
    },

    /// The session has been torn down
    #[error("use of closed connection")]
    Closed,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serialport::Error> for Error {
    fn from(err: serialport::Error) -> Self {
        Self::Serial(err.to_string())
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(inner) => io::Error::new(inner.kind(), Error::Io(inner)),
            Error::Timeout { .. } => io::Error::new(io::ErrorKind::TimedOut, err),
            Error::Closed => io::Error::new(io::ErrorKind::NotConnected, err),
            Error::DeviceVanished { .. } => io::Error::new(io::ErrorKind::NotFound, err),
            other => io::Error::other(other),
        }
    }
}

impl Error {
    /// Whether retrying on the same port is pointless
    ///
    /// Looks through [`Error::Setup`], so a device lost during setup counts.
    #[must_use]
    pub fn is_vanished(&self) -> bool {
        match self {
            Self::DeviceVanished { .. } => true,
            Self::Setup { source, .. } => source.is_vanished(),
            _ => false,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_keeps_source() {
        let err = Error::Setup {
            command: "MY N0CALL".into(),
            source: Box::new(Error::Timeout {
                expected: 5,
                received: 0,
            }),
        };
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "timeout while reading 5 bytes (got 0)");
    }

    #[test]
    fn cloned_io_error_shares_inner() {
        let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        let copy = err.clone();
        match (err, copy) {
            (Error::Io(a), Error::Io(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("expected io errors"),
        }
    }

    #[test]
    fn vanished_is_fatal() {
        let err = Error::DeviceVanished {
            path: PathBuf::from("/dev/ttyUSB0"),
        };
        assert!(err.is_vanished());
        assert_eq!(err.to_string(), "serial device /dev/ttyUSB0 vanished");
        assert!(!Error::Closed.is_vanished());

        let during_setup = Error::Setup {
            command: "QUIT".into(),
            source: Box::new(err),
        };
        assert!(during_setup.is_vanished());
        let timed_out = Error::Setup {
            command: "QUIT".into(),
            source: Box::new(Error::Timeout {
                expected: 5,
                received: 0,
            }),
        };
        assert!(!timed_out.is_vanished());
    }

    #[test]
    fn io_conversion_keeps_kind() {
        let timeout = io::Error::from(Error::Timeout {
            expected: 2,
            received: 1,
        });
        assert_eq!(timeout.kind(), io::ErrorKind::TimedOut);

        let broken = io::Error::from(Error::from(io::Error::from(io::ErrorKind::BrokenPipe)));
        assert_eq!(broken.kind(), io::ErrorKind::BrokenPipe);

        assert_eq!(io::Error::from(Error::Closed).kind(), io::ErrorKind::NotConnected);
        assert_eq!(io::Error::from(Error::Hostmode).kind(), io::ErrorKind::Other);
    }
}
