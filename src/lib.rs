//! Session driver for SCS PTC modems in WA8DED hostmode
//!
//! A [`Session`] configures the modem over its serial line, switches it to
//! hostmode and runs a background engine that polls the PACTOR channel.
//! The session then behaves like a byte stream to the called station.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::io::Write;
//! use ptc::{Session, SessionConfig};
//!
//! let config = SessionConfig::new("/dev/ttyUSB0", 57_600, "N0CALL", "DL1ABC").with_env_debug();
//! let mut session = Session::dial(&config)?;
//!
//! session.write_all(b"hello\r")?;
//! let mut buf = [0u8; 256];
//! let n = session.read(&mut buf)?;
//! println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//! session.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Layers
//!
//! - [`protocol`]: frame layout, response types, link state codes
//! - [`transport`]: the serial port and request/response I/O on it
//! - [`session`]: setup, the polling engine and the stream surface

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;
pub mod session;
pub mod transport;

pub use protocol::{Error, LinkState, MAX_PAYLOAD_SIZE, PACTOR_CHANNEL, Result};
pub use session::{Address, Session, SessionConfig, Timings};
pub use transport::{Port, SerialLink, StatsSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
