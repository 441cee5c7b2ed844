//! Byte transport to the modem and frame-level I/O on top of it.

mod frame_io;
mod line;
mod serial;
mod stats;

use std::io;
use std::path::Path;

pub use frame_io::{FrameIo, Response};
pub use line::{LineRead, read_delimited};
pub use serial::SerialLink;
pub use stats::{LinkStats, StatsSnapshot};

/// Byte stream to the modem.
///
/// Reads must not block forever: after the port's read timeout they return
/// `Ok(0)` (or whatever was received so far).
pub trait Port: Send {
    /// Read up to `buf.len()` bytes, returning 0 on timeout.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `buf`.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Release the device.
    fn close(&mut self) -> io::Result<()>;

    /// Whether the backing device still exists.
    fn is_present(&self) -> bool {
        true
    }

    /// Device path, for error reporting.
    fn path(&self) -> &Path;
}
