//! A simulated PTC modem for driving sessions without hardware.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use ptc::{Port, SessionConfig, Timings};

pub const LOCAL: &str = "N0CALL";
pub const REMOTE: &str = "DL1ABC";

/// Modem state visible to tests.
#[derive(Debug)]
pub struct Modem {
    pub hostmode: bool,
    /// Line-mode commands received, without CR
    pub setup_lines: Vec<String>,
    /// Line-mode commands that get no answer
    pub silent_on: Vec<String>,
    /// Skip the JHOST1 echo
    pub refuse_hostmode: bool,
    /// Hostmode commands received, `(channel, text)`
    pub commands: Vec<(u8, String)>,
    /// Data frames received
    pub data: Vec<Vec<u8>>,
    /// Raw answers to hand out for the next `G` polls
    pub events: VecDeque<Vec<u8>>,
    /// Digit reported in link status answers
    pub link_state: u8,
    /// Link state adopted after a connect command
    pub state_after_connect: u8,
    /// Header sent back for data frames instead of `[channel, 0]`
    pub data_ack: Option<[u8; 2]>,
    pub port_closed: bool,
    line: Vec<u8>,
    frame: Vec<u8>,
    outbound: VecDeque<u8>,
}

impl Default for Modem {
    fn default() -> Self {
        Self {
            hostmode: false,
            setup_lines: Vec::new(),
            silent_on: Vec::new(),
            refuse_hostmode: false,
            commands: Vec::new(),
            data: Vec::new(),
            events: VecDeque::new(),
            link_state: b'0',
            state_after_connect: b'4',
            data_ack: None,
            port_closed: false,
            line: Vec::new(),
            frame: Vec::new(),
            outbound: VecDeque::new(),
        }
    }
}

impl Modem {
    fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if self.hostmode {
                self.frame.push(byte);
                self.try_frame();
            } else if byte == b'\r' {
                let line = std::mem::take(&mut self.line);
                self.on_line(&line);
            } else if byte != b'\n' {
                self.line.push(byte);
            }
        }
    }

    fn on_line(&mut self, raw: &[u8]) {
        if raw.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(raw).into_owned();
        self.setup_lines.push(line.clone());
        if self.silent_on.contains(&line) {
            return;
        }
        if line == "JHOST1" {
            if !self.refuse_hostmode {
                self.outbound.extend(b"JHOST1");
                self.hostmode = true;
            }
            return;
        }
        self.outbound.extend(b"cmd: ");
    }

    fn try_frame(&mut self) {
        if self.frame.len() < 3 {
            return;
        }
        let body_len = usize::from(self.frame[2]) + 1;
        if self.frame.len() < 3 + body_len {
            return;
        }
        let channel = self.frame[0];
        let kind = self.frame[1];
        let body = self.frame[3..].to_vec();
        self.frame.clear();
        if kind == 0 {
            self.data.push(body);
            let ack = self.data_ack.unwrap_or([channel, 0]);
            self.reply(&ack);
        } else {
            self.on_command(channel, &String::from_utf8_lossy(&body));
        }
    }

    fn on_command(&mut self, channel: u8, command: &str) {
        self.commands.push((channel, command.to_owned()));
        match command {
            "G" => {
                let event = self.events.pop_front().unwrap_or_else(|| vec![channel, 0]);
                self.reply(&event);
            }
            "L" => {
                self.reply(&[channel, 1]);
                let status = format!("0 0 0 0 0 {}\0", char::from(self.link_state));
                self.reply(status.as_bytes());
            }
            "JHOST0" => self.hostmode = false,
            connect if connect.starts_with("C ") => {
                self.link_state = self.state_after_connect;
                self.reply(&[channel, 0]);
            }
            _ => self.reply(&[channel, 0]),
        }
    }

    fn reply(&mut self, bytes: &[u8]) {
        self.outbound.extend(bytes);
    }

    pub fn count(&self, channel: u8, command: &str) -> usize {
        self.commands
            .iter()
            .filter(|(ch, cmd)| *ch == channel && cmd == command)
            .count()
    }

    pub fn data_bytes(&self) -> Vec<u8> {
        self.data.concat()
    }
}

/// Handle to a simulated modem; clones share the same device.
#[derive(Clone)]
pub struct Device {
    modem: Arc<Mutex<Modem>>,
    present: Arc<AtomicBool>,
    path: PathBuf,
}

impl Device {
    pub fn new() -> Self {
        Self {
            modem: Arc::default(),
            present: Arc::new(AtomicBool::new(true)),
            path: PathBuf::from("/dev/ttySIM0"),
        }
    }

    pub fn modem(&self) -> MutexGuard<'_, Modem> {
        self.modem.lock().unwrap()
    }

    pub fn port(&self) -> Box<dyn Port> {
        Box::new(self.clone())
    }

    pub fn unplug(&self) {
        self.present.store(false, Ordering::SeqCst);
    }

    /// Queue a payload event (type 7) for the next poll.
    pub fn push_payload(&self, channel: u8, payload: &[u8]) {
        assert!(!payload.is_empty() && payload.len() <= 256);
        let mut event = vec![channel, 7, u8::try_from(payload.len() - 1).unwrap()];
        event.extend_from_slice(payload);
        self.modem().events.push_back(event);
    }

    /// Wait until `check` holds or `timeout` passes.
    pub fn wait_for(&self, timeout: Duration, check: impl Fn(&Modem) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if check(&self.modem()) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        check(&self.modem())
    }
}

impl Port for Device {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut modem = self.modem();
        let n = buf.len().min(modem.outbound.len());
        for (slot, byte) in buf.iter_mut().zip(modem.outbound.drain(..n)) {
            *slot = byte;
        }
        if n == 0 {
            drop(modem);
            thread::sleep(Duration::from_millis(1));
        }
        Ok(n)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if !self.present.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.modem().feed(buf);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.modem().port_closed = true;
        Ok(())
    }

    fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

pub fn fast_timings() -> Timings {
    Timings {
        frame_settle: Duration::from_millis(1),
        serial_read: Duration::from_millis(10),
        call_register: Duration::from_millis(100),
        link_poll_interval: Duration::from_millis(10),
        link_poll_attempts: 5,
        drain: Duration::from_secs(5),
        read_attempt: Duration::from_millis(20),
    }
}

pub fn config() -> SessionConfig {
    SessionConfig::new("/dev/ttySIM0", 57_600, LOCAL, REMOTE).with_timings(fast_timings())
}
