//! State shared between the consumer-facing session and the engine thread.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::protocol::{Error, LinkState, Result, STATE_IDLE};
use crate::transport::{FrameIo, LinkStats};

use super::buffers::{Queues, TxState};

/// Outcome of a teardown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Teardown {
    /// Teardown had been requested before this call.
    pub was_closing: bool,
    /// Outbound bytes thrown away.
    pub discarded: usize,
}

#[derive(Debug)]
pub struct Shared {
    io: Mutex<FrameIo>,
    tx: Mutex<TxState>,
    link: AtomicI32,
    error: OnceLock<Error>,
    halt: AtomicBool,
    stopped: AtomicBool,
    pub queues: Queues,
    pub stats: Arc<LinkStats>,
    pub debug: bool,
}

impl Shared {
    pub fn new(io: FrameIo, stats: Arc<LinkStats>, debug: bool) -> Self {
        Self {
            io: Mutex::new(io),
            tx: Mutex::new(TxState::default()),
            link: AtomicI32::new(STATE_IDLE),
            error: OnceLock::new(),
            halt: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            queues: Queues::new(),
            stats,
            debug,
        }
    }

    pub fn io(&self) -> MutexGuard<'_, FrameIo> {
        self.io.lock().expect("frame io mutex poisoned")
    }

    pub fn tx(&self) -> MutexGuard<'_, TxState> {
        self.tx.lock().expect("tx buffer mutex poisoned")
    }

    pub fn link_code(&self) -> i32 {
        self.link.load(Ordering::SeqCst)
    }

    pub fn link_state(&self) -> LinkState {
        LinkState::from_code(self.link_code())
    }

    pub fn set_link_code(&self, code: i32) {
        self.link.store(code, Ordering::SeqCst);
    }

    pub fn terminal_error(&self) -> Option<&Error> {
        self.error.get()
    }

    /// `Err` with the terminal error if one was recorded.
    pub fn terminal_result(&self) -> Result<()> {
        self.error.get().map_or(Ok(()), |err| Err(err.clone()))
    }

    /// Check done by every consumer call before it touches anything.
    pub fn check_state(&self) -> Result<()> {
        self.terminal_result()?;
        if self.tx().closing {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Set the teardown flag if nobody did yet. Returns whether this call set it.
    ///
    /// A pending "ready to disconnect" is dropped under the same lock, so the
    /// next one the caller sees was raised after teardown began.
    pub fn request_close(&self) -> bool {
        let mut tx = self.tx();
        if tx.closing {
            return false;
        }
        tx.closing = true;
        self.queues.ready_to_disconnect.clear();
        true
    }

    pub fn is_closing(&self) -> bool {
        self.tx().closing
    }

    /// End the session from the engine side.
    ///
    /// Sets the teardown flag and drops buffered output. `error` becomes the
    /// terminal error unless teardown had already been requested, in which
    /// case it is an expected side effect of closing and is dropped.
    pub fn teardown(&self, error: Option<Error>) -> Teardown {
        let mut tx = self.tx();
        let was_closing = tx.closing;
        tx.closing = true;
        let discarded = tx.discard();
        if let (Some(err), false) = (error, was_closing) {
            let _ = self.error.set(err);
        }
        Teardown {
            was_closing,
            discarded,
        }
    }

    pub fn halt(&self) {
        self.halt.store(true, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.halt.load(Ordering::SeqCst)
    }

    pub fn mark_stopped(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
