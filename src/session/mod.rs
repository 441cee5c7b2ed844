//! PTC session: a connection-like stream over a hostmode link.
//!
//! A [`Session`] owns the serial port through a background engine thread.
//! The consumer talks to it through `read`, `write`, `call` and `close`;
//! none of those touch the port while the engine runs.

mod buffers;
mod config;
mod engine;
mod setup;
mod shared;

use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes};
use crossbeam::channel::RecvTimeoutError;
use tracing::{debug, info, instrument, trace, warn};

use crate::protocol::{
    CMD_DISCONNECT, Error, LinkState, PACTOR_CHANNEL, Result, connect_command,
};
use crate::transport::{FrameIo, LinkStats, Port, SerialLink, StatsSnapshot};

pub use buffers::{COMMAND_CAPACITY, INBOUND_CAPACITY, Signal, TX_THRESHOLD};
pub use config::{
    Address, DEBUG_ENV, DEBUG_ENV_LEGACY, SessionConfig, Timings, debug_from_env,
    load_init_script,
};
pub use setup::{DEFAULT_TUNING, PROMPT, SCRIPT_PROMPT};

use engine::Engine;
use shared::Shared;

/// Upper bound on one wait for "ready to disconnect" during close.
const DRAIN_POLL: Duration = Duration::from_millis(250);

/// A hostmode session with one remote station.
#[derive(Debug)]
pub struct Session {
    shared: Arc<Shared>,
    engine: Mutex<Option<JoinHandle<()>>>,
    pending: Mutex<Bytes>,
    local: Address,
    remote: Mutex<Address>,
    timings: Timings,
}

impl Session {
    /// Open the configured serial device and bring up hostmode.
    #[instrument(level = "info", skip_all, fields(device = %config.device.display()))]
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let port = SerialLink::open(&config.device, config.baud_rate, config.timings.serial_read)?;
        Self::with_port(Box::new(port), config)
    }

    /// Open the device and call the configured remote station.
    pub fn dial(config: &SessionConfig) -> Result<Self> {
        let session = Self::open(config)?;
        session.call(&config.remote)?;
        Ok(session)
    }

    /// Bring up hostmode on an already open port and start the engine.
    ///
    /// Runs the line-mode setup (quit, callsign, channel, tuning or init
    /// script), enters hostmode and spawns the engine thread. Any failure
    /// aborts and the port is closed; no engine is started.
    #[instrument(level = "info", skip_all, fields(local = %config.local))]
    pub fn with_port(port: Box<dyn Port>, config: &SessionConfig) -> Result<Self> {
        let stats = Arc::new(LinkStats::default());
        let mut io = FrameIo::new(
            port,
            config.timings.frame_settle,
            config.debug,
            Arc::clone(&stats),
        );

        if let Err(err) = setup::configure(&mut io, config).and_then(|()| io.enter_hostmode()) {
            warn!(error = %err, "initialization failed");
            if let Err(err) = io.shutdown() {
                debug!(error = %err, "closing after failed initialization");
            }
            return Err(err);
        }

        let shared = Arc::new(Shared::new(io, stats, config.debug));
        let engine = Engine::new(Arc::clone(&shared), PACTOR_CHANNEL);
        let handle = thread::Builder::new()
            .name("ptc-engine".into())
            .spawn(move || engine.run());
        let handle = match handle {
            Ok(handle) => handle,
            Err(err) => {
                if let Err(err) = shared.io().shutdown() {
                    debug!(error = %err, "closing after failed engine spawn");
                }
                return Err(err.into());
            }
        };

        info!("session initialized");
        Ok(Self {
            shared,
            engine: Mutex::new(Some(handle)),
            pending: Mutex::new(Bytes::new()),
            local: Address::new(config.local.clone()),
            remote: Mutex::new(Address::new(config.remote.clone())),
            timings: config.timings.clone(),
        })
    }

    /// Call `remote` and wait until the link is up.
    ///
    /// Polls the link state while the modem reports link setup, for at most
    /// [`Timings::link_poll_attempts`] intervals. If the link is not
    /// connected afterwards the session is closed and
    /// [`Error::CannotLink`] is returned.
    #[instrument(level = "info", skip(self))]
    pub fn call(&self, remote: &str) -> Result<()> {
        self.shared.check_state()?;
        remote.clone_into(&mut self.remote.lock().expect("remote mutex poisoned").callsign);

        info!("calling");
        self.shared
            .queues
            .command_tx
            .send(connect_command(remote))
            .map_err(|_| Error::Closed)?;

        // Give the modem time to pick up the command; before that a failed
        // call and a not-yet-started one look the same.
        thread::sleep(self.timings.call_register);

        let mut attempts = 0;
        while self.link_state() == LinkState::LinkSetup
            && attempts < self.timings.link_poll_attempts
        {
            attempts += 1;
            trace!(attempts, "waiting for link");
            thread::sleep(self.timings.link_poll_interval);
        }

        let state = self.link_state();
        if state != LinkState::Connected {
            warn!(%state, "cannot link");
            if let Err(err) = self.close() {
                debug!(error = %err, "close after failed call");
            }
            return Err(Error::CannotLink {
                remote: remote.to_owned(),
                state: state.code(),
            });
        }
        info!("linked");
        Ok(())
    }

    /// Read payload into `buf`.
    ///
    /// Blocks until the engine delivers a frame. A frame larger than `buf`
    /// is handed out over several reads.
    ///
    /// The session state is checked before anything is handed out, so the
    /// unread rest of a frame is lost once the session has ended.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.shared.check_state()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let mut pending = self.pending.lock().expect("pending mutex poisoned");
        if pending.is_empty() {
            *pending = self.next_inbound()?;
        }
        let n = pending.len().min(buf.len());
        pending.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }

    fn next_inbound(&self) -> Result<Bytes> {
        loop {
            match self
                .shared
                .queues
                .inbound_rx
                .recv_timeout(self.timings.read_attempt)
            {
                Ok(frame) => return Ok(frame),
                Err(RecvTimeoutError::Timeout) => {
                    trace!("reading from inbound queue timed out");
                    self.shared.check_state()?;
                    if self.shared.is_stopped() {
                        return Err(Error::Closed);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Err(Error::Closed),
            }
        }
    }

    /// Queue `data` for transmission.
    ///
    /// Waits for the engine's "ready to send" signal first, so a writer
    /// cannot run far ahead of the modem. Returning only means the bytes are
    /// buffered.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.shared.check_state()?;
        if data.is_empty() {
            return Ok(0);
        }

        loop {
            if self.shared.queues.ready_to_send.wait(self.timings.read_attempt) {
                let mut tx = self.shared.tx();
                if tx.closing {
                    return Err(self.shared.terminal_result().err().unwrap_or(Error::Closed));
                }
                // A raise from before the previous write may still be pending.
                if tx.buffer.len() <= TX_THRESHOLD {
                    tx.buffer.extend_from_slice(data);
                    return Ok(data.len());
                }
                continue;
            }
            self.shared.check_state()?;
            if self.shared.is_stopped() {
                return Err(Error::Closed);
            }
        }
    }

    /// Disconnect, drain and leave hostmode.
    ///
    /// Only the first call does the work; later and concurrent calls return
    /// the terminal error (if any) straight away. The drain wait is bounded
    /// by [`Timings::drain`], after which hostmode is left regardless.
    #[instrument(level = "info", skip(self))]
    pub fn close(&self) -> Result<()> {
        if !self.shared.request_close() {
            debug!("close already in progress");
            return self.shared.terminal_result();
        }
        info!("close called");

        let queues = &self.shared.queues;
        if queues.command_tx.try_send(CMD_DISCONNECT.to_owned()).is_err() {
            warn!("command queue full, disconnect not queued");
        }

        let deadline = Instant::now() + self.timings.drain;
        loop {
            if self.shared.is_stopped() {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("buffered data not drained in time, closing anyway");
                break;
            }
            if queues.ready_to_disconnect.wait(remaining.min(DRAIN_POLL))
                && queues.command_rx.is_empty()
            {
                break;
            }
        }

        self.shared.halt();
        self.join_engine();

        if let Err(err) = self.shared.io().shutdown() {
            debug!(error = %err, "leaving hostmode failed");
        }
        info!("session closed");
        self.shared.terminal_result()
    }

    fn join_engine(&self) {
        let handle = self.engine.lock().expect("engine mutex poisoned").take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("engine thread panicked");
            }
        }
    }

    /// Own address.
    #[must_use]
    pub fn local_addr(&self) -> Address {
        self.local.clone()
    }

    /// Address of the called station.
    #[must_use]
    pub fn remote_addr(&self) -> Address {
        self.remote.lock().expect("remote mutex poisoned").clone()
    }

    /// Link state from the most recent status poll.
    #[must_use]
    pub fn link_state(&self) -> LinkState {
        self.shared.link_state()
    }

    /// The error that ended the session, if any.
    #[must_use]
    pub fn terminal_error(&self) -> Option<Error> {
        self.shared.terminal_error().cloned()
    }

    /// Whether teardown has been requested or happened.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closing()
    }

    /// Traffic counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Not implemented: accepted and ignored.
    pub fn set_deadline(&self, _deadline: Option<Instant>) -> Result<()> {
        Ok(())
    }

    /// Not implemented: accepted and ignored.
    pub fn set_read_deadline(&self, _deadline: Option<Instant>) -> Result<()> {
        Ok(())
    }

    /// Not implemented: accepted and ignored.
    pub fn set_write_deadline(&self, _deadline: Option<Instant>) -> Result<()> {
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.shared.is_stopped() && !self.shared.is_halted() {
            debug!("session dropped without close, halting engine");
            self.shared.halt();
        }
    }
}

impl io::Read for &Session {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match Session::read(self, buf) {
            Err(Error::Closed) => Ok(0),
            other => other.map_err(io::Error::from),
        }
    }
}

impl io::Read for Session {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}

impl io::Write for &Session {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Session::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for Session {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
