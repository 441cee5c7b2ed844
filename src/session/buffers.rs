//! Flow-control buffers between the consumer and the engine.
//!
//! The outbound byte buffer sits behind a mutex together with the teardown
//! flag. Everything else is a bounded channel: inbound payload, pending
//! commands, and two single-slot readiness signals.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use crossbeam::channel::{self, Receiver, Sender};

/// Writes wait for "ready to send" once more than this many bytes are queued.
pub const TX_THRESHOLD: usize = 128;

/// Inbound frames the engine may queue before it stalls.
pub const INBOUND_CAPACITY: usize = 8192;

/// Pending control commands.
pub const COMMAND_CAPACITY: usize = 64;

/// Outbound data and the teardown flag; always accessed under one lock.
#[derive(Debug, Default)]
pub struct TxState {
    /// Bytes written by the consumer, not yet handed to the modem.
    pub buffer: BytesMut,
    /// Teardown has been requested. Never cleared.
    pub closing: bool,
}

impl TxState {
    /// Drop all buffered bytes, returning how many there were.
    pub fn discard(&mut self) -> usize {
        let len = self.buffer.len();
        self.buffer.clear();
        len
    }
}

/// Single-slot notification. Raising is non-blocking and never queues more
/// than one pending notification.
#[derive(Debug, Clone)]
pub struct Signal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Signal {
    /// Empty signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(1);
        Self { tx, rx }
    }

    /// Raise the signal; a no-op if it is already raised.
    pub fn raise(&self) {
        let _ = self.tx.try_send(());
    }

    /// Consume the signal, waiting up to `timeout`. Returns whether it was raised.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }

    /// Consume a pending raise without waiting.
    pub fn clear(&self) {
        let _ = self.rx.try_recv();
    }

    /// Whether a raise is pending.
    #[cfg(test)]
    fn is_raised(&self) -> bool {
        !self.rx.is_empty()
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

/// Channels owned by the session.
#[derive(Debug)]
pub struct Queues {
    /// Engine to consumer: payload frames.
    pub inbound_tx: Sender<Bytes>,
    /// Consumer side of the inbound queue.
    pub inbound_rx: Receiver<Bytes>,
    /// Consumer to engine: control commands.
    pub command_tx: Sender<String>,
    /// Engine side of the command queue.
    pub command_rx: Receiver<String>,
    /// Outbound buffer is at or below [`TX_THRESHOLD`].
    pub ready_to_send: Signal,
    /// Outbound buffer is empty.
    pub ready_to_disconnect: Signal,
}

impl Queues {
    /// Allocate all queues and signals.
    #[must_use]
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = channel::bounded(INBOUND_CAPACITY);
        let (command_tx, command_rx) = channel::bounded(COMMAND_CAPACITY);
        Self {
            inbound_tx,
            inbound_rx,
            command_tx,
            command_rx,
            ready_to_send: Signal::new(),
            ready_to_disconnect: Signal::new(),
        }
    }
}

impl Default for Queues {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_holds_one_raise() {
        let signal = Signal::new();
        assert!(!signal.wait(Duration::from_millis(1)));
        signal.raise();
        signal.raise();
        signal.raise();
        assert!(signal.is_raised());
        assert!(signal.wait(Duration::from_millis(1)));
        assert!(!signal.wait(Duration::from_millis(1)));
    }

    #[test]
    fn signal_clear_drops_stale_raise() {
        let signal = Signal::new();
        signal.raise();
        signal.clear();
        assert!(!signal.is_raised());
    }

    #[test]
    fn signal_wakes_waiting_thread() {
        let signal = Signal::new();
        let remote = signal.clone();
        let waiter = std::thread::spawn(move || remote.wait(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(20));
        signal.raise();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn tx_state_discard() {
        let mut state = TxState::default();
        state.buffer.extend_from_slice(&[1, 2, 3]);
        assert_eq!(state.discard(), 3);
        assert!(state.buffer.is_empty());
        assert!(!state.closing);
    }

    #[test]
    fn command_queue_is_fifo() {
        let queues = Queues::new();
        queues.command_tx.send("C DL1ABC".into()).unwrap();
        queues.command_tx.send("D".into()).unwrap();
        assert_eq!(queues.command_rx.try_recv().unwrap(), "C DL1ABC");
        assert_eq!(queues.command_rx.try_recv().unwrap(), "D");
        assert!(queues.command_rx.is_empty());
    }
}
