//! The polling engine: one background thread driving the modem.
//!
//! Each cycle runs, in this order:
//!
//! 1. send one queued command, if any, and read its answer
//! 2. poll (`G`) for pending events
//! 3. dispatch the event, queueing payload for the consumer
//! 4. query link status (`L`); a disconnect code ends the session
//! 5. raise "ready to send" while the outbound buffer is small
//! 6. if data is buffered, re-query `L` and send one slice when the modem
//!    reports `4`
//! 7. raise "ready to disconnect" once the outbound buffer is empty
//!
//! The modem answers one request at a time, so all of this shares a single
//! serialized request stream.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::SendTimeoutError;
use tracing::{debug, info, trace, warn};

use crate::protocol::{
    CMD_LINK_STATUS, CMD_POLL, Error, LinkState, ResponseType, Result, TxReadiness, decode_status,
    take_chunk,
};
use crate::transport::{FrameIo, Response};

use super::buffers::TX_THRESHOLD;
use super::shared::Shared;

const DELIVER_RETRY: Duration = Duration::from_millis(100);

/// What the engine does after a cycle.
#[derive(Debug)]
enum Flow {
    Continue,
    /// Session over; `Some` carries the reason if it was a failure.
    End(Option<Error>),
}

pub struct Engine {
    shared: Arc<Shared>,
    channel: u8,
}

impl Engine {
    pub fn new(shared: Arc<Shared>, channel: u8) -> Self {
        Self { shared, channel }
    }

    /// Run cycles until the session ends or the engine is halted.
    pub fn run(self) {
        info!(channel = self.channel, "engine started");
        loop {
            if self.shared.is_halted() {
                self.on_halt();
                break;
            }
            let mut io = self.shared.io();
            let flow = self.cycle(&mut io).unwrap_or_else(|err| Flow::End(Some(err)));
            if let Flow::End(reason) = flow {
                self.finish(&mut io, reason);
                break;
            }
        }
        self.shared.mark_stopped();
        info!("engine stopped");
    }

    fn cycle(&self, io: &mut FrameIo) -> Result<Flow> {
        if let Ok(command) = self.shared.queues.command_rx.try_recv() {
            self.send_command(io, &command)?;
        }

        let event = io.exchange(self.channel, CMD_POLL)?;
        self.dispatch(event);

        if let Some(code) = self.link_status(io)? {
            self.shared.set_link_code(code);
            let state = LinkState::from_code(code);
            if state.is_terminal() {
                info!(code, "connection ended or lost");
                return Ok(Flow::End(None));
            }
        }

        let buffered = {
            let tx = self.shared.tx();
            if tx.buffer.len() <= TX_THRESHOLD {
                self.shared.queues.ready_to_send.raise();
            }
            tx.buffer.len()
        };

        if buffered > 0 {
            let readiness = self
                .link_status(io)?
                .map_or(TxReadiness::Busy, TxReadiness::from_code);
            match readiness {
                TxReadiness::NoLink => {
                    warn!(buffered, "connection ended while data was still in the buffer");
                    return Ok(Flow::End(Some(Error::LinkLost {
                        discarded: buffered,
                    })));
                }
                TxReadiness::Ready => self.transmit(io)?,
                TxReadiness::Busy => trace!("modem busy, holding data"),
            }
        }

        // Raised under the lock so close never sees a raise that predates it.
        {
            let tx = self.shared.tx();
            if tx.buffer.is_empty() {
                self.shared.queues.ready_to_disconnect.raise();
            }
        }

        self.shared.stats.record_poll_cycle();
        Ok(Flow::Continue)
    }

    fn send_command(&self, io: &mut FrameIo, command: &str) -> Result<()> {
        debug!(command, "handling command");
        let response = io.exchange(self.channel, command)?;
        if response.header.response_type() == Some(ResponseType::ErrorMessage) {
            let message = response
                .body
                .as_deref()
                .map(String::from_utf8_lossy)
                .unwrap_or_default();
            warn!(command, %message, "modem rejected command");
        }
        Ok(())
    }

    fn dispatch(&self, event: Response) {
        let Response { header, body } = event;
        match (header.response_type(), body) {
            (Some(ResponseType::Payload), Some(payload)) => self.deliver(payload),
            (Some(kind), Some(body)) if self.shared.debug => {
                debug!(%kind, body = %String::from_utf8_lossy(&body), "event discarded");
            }
            _ => {}
        }
    }

    fn deliver(&self, payload: Bytes) {
        self.shared.stats.record_payload_received(payload.len());
        if self.shared.debug {
            debug!(len = payload.len(), "payload received");
        }
        let mut payload = payload;
        loop {
            match self
                .shared
                .queues
                .inbound_tx
                .send_timeout(payload, DELIVER_RETRY)
            {
                Ok(()) => return,
                Err(SendTimeoutError::Timeout(back)) => {
                    if self.shared.is_halted() {
                        warn!("inbound queue full while halting, payload dropped");
                        return;
                    }
                    payload = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }

    /// Query `L` and decode the state digit. `None` if the modem sent an
    /// empty status line.
    fn link_status(&self, io: &mut FrameIo) -> Result<Option<i32>> {
        io.send_command(self.channel, CMD_LINK_STATUS)?;
        io.read_header()?;
        let body = io.read_until(&[0])?;
        let code = decode_status(&body);
        if code.is_none() {
            warn!("empty link status");
        }
        Ok(code)
    }

    fn transmit(&self, io: &mut FrameIo) -> Result<()> {
        let chunk = take_chunk(&mut self.shared.tx().buffer);
        if chunk.is_empty() {
            return Ok(());
        }
        if self.shared.debug {
            debug!(len = chunk.len(), "sending payload");
        }
        io.send_data(self.channel, &chunk)?;
        let ack = io.read_header()?;
        if !ack.acknowledges(self.channel) {
            self.shared.stats.record_ack_mismatch();
            if ack.channel() == self.channel {
                warn!(code = ack.code(), "error while sending");
            } else {
                warn!(channel = ack.channel(), "cannot read channel back");
            }
        }
        Ok(())
    }

    fn finish(&self, io: &mut FrameIo, reason: Option<Error>) {
        let failure = reason.as_ref().map(ToString::to_string);
        let teardown = self.shared.teardown(reason);
        if teardown.discarded > 0 {
            warn!(discarded = teardown.discarded, "buffered data discarded");
        }
        match (failure, teardown.was_closing) {
            (Some(error), false) => warn!(%error, "session ended by error"),
            (Some(error), true) => debug!(%error, "error while closing, ignored"),
            (None, _) => info!("session ended"),
        }
        self.shared.queues.ready_to_disconnect.raise();
        if let Err(err) = io.shutdown() {
            debug!(error = %err, "leaving hostmode failed");
        }
    }

    /// Halted from outside. `close` does the shutdown itself; a dropped
    /// session leaves it to the engine.
    fn on_halt(&self) {
        if self.shared.is_closing() {
            debug!("engine halted by close");
            return;
        }
        debug!("engine halted without close");
        self.shared.teardown(None);
        if let Err(err) = self.shared.io().shutdown() {
            debug!(error = %err, "leaving hostmode failed");
        }
    }
}
