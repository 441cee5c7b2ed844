//! Frame-level I/O against a [`Port`].
//!
//! `FrameIo` owns the port and a read-ahead buffer. Every hostmode frame is
//! written in one piece and followed by a settle pause; the modem drops
//! frames that arrive back to back.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use super::line::{LineRead, read_delimited};
use super::stats::LinkStats;
use super::Port;
use crate::protocol::{
    self, BodyFormat, CMD_DISCONNECT, CMD_ENTER_HOSTMODE, CMD_LEAVE_HOSTMODE, CONTROL_CHANNEL,
    Error, FrameKind, PACTOR_CHANNEL, RESPONSE_HEADER_SIZE, ResponseHeader, Result,
};

const READ_CHUNK: usize = 256;

/// A decoded response: header plus its body, if the type carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Channel and type
    pub header: ResponseHeader,
    /// Message text (NUL stripped) or raw length-prefixed bytes
    pub body: Option<Bytes>,
}

/// Port wrapper speaking hostmode frames and line-mode setup commands.
pub struct FrameIo {
    port: Option<Box<dyn Port>>,
    rx: BytesMut,
    settle: Duration,
    debug: bool,
    hostmode: bool,
    stats: Arc<LinkStats>,
}

impl FrameIo {
    /// Wrap an open port.
    #[must_use]
    pub fn new(port: Box<dyn Port>, settle: Duration, debug: bool, stats: Arc<LinkStats>) -> Self {
        Self {
            port: Some(port),
            rx: BytesMut::with_capacity(READ_CHUNK),
            settle,
            debug,
            hostmode: false,
            stats,
        }
    }

    /// Whether the port has not been closed yet.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Whether the modem is in hostmode as far as the driver knows.
    #[must_use]
    pub const fn in_hostmode(&self) -> bool {
        self.hostmode
    }

    fn port(&mut self) -> Result<&mut Box<dyn Port>> {
        let port = self.port.as_mut().ok_or(Error::Closed)?;
        if !port.is_present() {
            return Err(Error::DeviceVanished {
                path: port.path().to_path_buf(),
            });
        }
        Ok(port)
    }

    /// Write one frame and wait for the settle interval.
    pub fn send_frame(&mut self, channel: u8, kind: FrameKind, body: &[u8]) -> Result<()> {
        let frame = protocol::encode(channel, kind, body)?;
        if self.debug {
            trace!(channel, ?kind, frame = ?frame.as_ref(), "frame out");
        }
        self.port()?.write_all(&frame)?;
        self.stats.record_frame_sent();
        if kind == FrameKind::Data {
            self.stats.record_payload_sent(body.len());
        }
        thread::sleep(self.settle);
        Ok(())
    }

    /// Write a command frame.
    pub fn send_command(&mut self, channel: u8, command: &str) -> Result<()> {
        if self.debug {
            debug!(channel, command, "command");
        }
        self.send_frame(channel, FrameKind::Command, command.as_bytes())
    }

    /// Write a data frame (at most 254 bytes).
    pub fn send_data(&mut self, channel: u8, data: &[u8]) -> Result<()> {
        self.send_frame(channel, FrameKind::Data, data)
    }

    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.port()?.read(&mut chunk)?;
        self.rx.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    /// Read exactly `n` bytes.
    ///
    /// Fails with [`Error::Timeout`] when a port read comes back empty
    /// before `n` bytes have been collected.
    pub fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        self.port()?;
        while self.rx.len() < n {
            if self.fill()? == 0 {
                let received = self.rx.len();
                self.rx.clear();
                return Err(Error::Timeout {
                    expected: n,
                    received,
                });
            }
        }
        Ok(self.rx.split_to(n).freeze())
    }

    /// Read until `delimiter` and return the bytes before it.
    pub fn read_until(&mut self, delimiter: &[u8]) -> Result<Bytes> {
        let result = read_delimited(self, delimiter);
        if let Err(err) = &result {
            debug!(delimiter = ?delimiter, error = %err, "read until delimiter failed");
        }
        result
    }

    /// Send a CR-terminated line-mode command and wait for `expected`.
    ///
    /// Only valid outside hostmode, during device setup.
    pub fn write_expect(&mut self, command: &str, expected: &str) -> Result<Bytes> {
        if self.debug {
            debug!(command, expected, "setup command");
        }
        let mut line = Vec::with_capacity(command.len() + 1);
        line.extend_from_slice(command.as_bytes());
        line.push(b'\r');
        self.port()?.write_all(&line)?;
        self.read_until(expected.as_bytes())
    }

    /// Read a 2-byte response header.
    pub fn read_header(&mut self) -> Result<ResponseHeader> {
        let raw = self.read_exact(RESPONSE_HEADER_SIZE)?;
        let header = ResponseHeader::from_bytes(&raw)?;
        self.stats.record_frame_received();
        if self.debug {
            trace!(channel = header.channel(), code = header.code(), "response");
        }
        Ok(header)
    }

    /// Read the body that belongs to `header`.
    ///
    /// Unknown response types carry no body the driver could skip; they are
    /// reported and treated as empty.
    pub fn read_body(&mut self, header: ResponseHeader) -> Result<Option<Bytes>> {
        let Some(kind) = header.response_type() else {
            warn!(
                channel = header.channel(),
                code = header.code(),
                "unknown response type"
            );
            return Ok(None);
        };
        match kind.body_format() {
            BodyFormat::Empty => Ok(None),
            BodyFormat::NullTerminated => self.read_until(&[0]).map(Some),
            BodyFormat::LengthPrefixed => {
                let len = self.read_exact(1)?.get_u8();
                self.read_exact(usize::from(len) + 1).map(Some)
            }
        }
    }

    /// Read a full response: header and body.
    pub fn read_response(&mut self) -> Result<Response> {
        let header = self.read_header()?;
        let body = self.read_body(header)?;
        if self.debug {
            if let Some(body) = &body {
                trace!(code = header.code(), body = ?body.as_ref(), "response body");
            }
        }
        Ok(Response { header, body })
    }

    /// Send a command and read its full response.
    pub fn exchange(&mut self, channel: u8, command: &str) -> Result<Response> {
        self.send_command(channel, command)?;
        self.read_response()
    }

    /// Switch the modem from line mode into hostmode.
    pub fn enter_hostmode(&mut self) -> Result<()> {
        debug!("entering WA8DED mode");
        if let Err(err) = self.write_expect(CMD_ENTER_HOSTMODE, CMD_ENTER_HOSTMODE) {
            warn!(error = %err, "no answer to the hostmode entry command");
            return Err(Error::Hostmode);
        }
        self.hostmode = true;
        debug!("entered host mode");
        Ok(())
    }

    /// Disconnect and return the modem to line mode.
    ///
    /// Does nothing when hostmode was already left. Every step is attempted
    /// even if an earlier one fails; the first failure is returned.
    pub fn leave_hostmode(&mut self) -> Result<()> {
        if !self.in_hostmode() {
            return Ok(());
        }
        self.hostmode = false;
        debug!("leaving WA8DED mode");
        let disconnect = self
            .send_command(PACTOR_CHANNEL, CMD_DISCONNECT)
            .and_then(|()| self.read_header().map(drop));
        let leave = self.send_command(CONTROL_CHANNEL, CMD_LEAVE_HOSTMODE);
        let newline = self
            .port()
            .and_then(|port| port.write_all(b"\r\n").map_err(Error::from));
        debug!("left WA8DED mode");
        disconnect.and(leave).and(newline)
    }

    /// Leave hostmode and close the port. Safe to call repeatedly.
    pub fn shutdown(&mut self) -> Result<()> {
        let left = self.leave_hostmode();
        if !self.is_open() {
            return left;
        }
        if let Some(mut port) = self.port.take() {
            let closed = port.close().map_err(Error::from);
            debug!(path = %port.path().display(), "transport closed");
            return left.and(closed);
        }
        left
    }
}

impl LineRead for FrameIo {
    fn read_line(&mut self, delim: u8) -> Result<Bytes> {
        loop {
            if let Some(pos) = self.rx.iter().position(|&b| b == delim) {
                return Ok(self.rx.split_to(pos + 1).freeze());
            }
            if self.fill()? == 0 {
                let received = self.rx.len();
                self.rx.clear();
                return Err(Error::Timeout {
                    expected: received + 1,
                    received,
                });
            }
        }
    }
}

impl std::fmt::Debug for FrameIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameIo")
            .field("open", &self.port.is_some())
            .field("hostmode", &self.hostmode)
            .field("buffered", &self.rx.len())
            .finish_non_exhaustive()
    }
}
