//! Serial line adapter for the PTC transport.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, instrument};

use super::Port;
use crate::protocol::Result;

/// Serial device opened 8N1 without flow control.
pub struct SerialLink {
    path: PathBuf,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLink {
    /// Open `path` at `baud_rate`; reads give up after `read_timeout`.
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let port = serialport::new(path.to_string_lossy(), baud_rate)
            .timeout(read_timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()?;
        debug!("serial port opened");
        Ok(Self {
            path,
            port: Some(port),
        })
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port closed"))
    }
}

impl Port for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port()?.read(buf) {
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(buf)?;
        port.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        if self.port.take().is_some() {
            debug!(path = %self.path.display(), "serial port closed");
        }
        Ok(())
    }

    fn is_present(&self) -> bool {
        self.path.exists()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("path", &self.path)
            .field("open", &self.port.is_some())
            .finish()
    }
}
