//! Session configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::protocol::{Error, Result};

/// Environment variable that switches on frame-level debug output.
pub const DEBUG_ENV: &str = "PTC_DEBUG";

/// Lower-case spelling accepted for compatibility with older setups.
pub const DEBUG_ENV_LEGACY: &str = "ptc_debug";

/// Intervals and limits used by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timings {
    /// Pause after every hostmode frame.
    pub frame_settle: Duration,
    /// Serial read timeout.
    pub serial_read: Duration,
    /// Wait after queueing a connect command before polling link state.
    pub call_register: Duration,
    /// Interval between link state checks while a call is set up.
    pub link_poll_interval: Duration,
    /// Number of link state checks before a call is given up.
    pub link_poll_attempts: u32,
    /// How long close waits for buffered data to drain.
    pub drain: Duration,
    /// How long one wait on the inbound queue lasts before state is re-checked.
    pub read_attempt: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            frame_settle: Duration::from_millis(100),
            serial_read: Duration::from_secs(1),
            call_register: Duration::from_secs(1),
            link_poll_interval: Duration::from_millis(500),
            link_poll_attempts: 120,
            drain: Duration::from_secs(60),
            read_attempt: Duration::from_secs(1),
        }
    }
}

/// Everything needed to bring up a session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Serial device, e.g. `/dev/ttyUSB0`.
    pub device: PathBuf,
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Own callsign.
    pub local: String,
    /// Station to call.
    pub remote: String,
    /// File with setup commands replacing the built-in tuning commands.
    pub init_script: Option<PathBuf>,
    /// Emit frame-level debug output.
    pub debug: bool,
    /// Protocol intervals.
    pub timings: Timings,
}

impl SessionConfig {
    /// Configuration with default timings and no init script.
    pub fn new(
        device: impl Into<PathBuf>,
        baud_rate: u32,
        local: impl Into<String>,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            local: local.into(),
            remote: remote.into(),
            init_script: None,
            debug: false,
            timings: Timings::default(),
        }
    }

    /// Take the debug switch from the process environment.
    #[must_use]
    pub fn with_env_debug(mut self) -> Self {
        self.debug = debug_from_env();
        self
    }

    /// Run the commands in `path` instead of the default tuning commands.
    #[must_use]
    pub fn with_init_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.init_script = Some(path.into());
        self
    }

    /// Switch frame-level debug output on or off.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Replace the protocol intervals.
    #[must_use]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }
}

/// Whether either debug variable is set to a non-empty value.
#[must_use]
pub fn debug_from_env() -> bool {
    [DEBUG_ENV, DEBUG_ENV_LEGACY]
        .iter()
        .any(|key| std::env::var_os(key).is_some_and(|v| !v.is_empty()))
}

/// Read setup commands, one per line.
pub fn load_init_script(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|err| Error::Script {
        path: path.to_path_buf(),
        source: Arc::new(err),
    })?;
    Ok(text
        .lines()
        .map(|line| line.trim_end_matches('\r').to_owned())
        .collect())
}

/// Station address: a callsign on the PACTOR network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    /// Callsign, e.g. `DL1ABC`
    pub callsign: String,
}

impl Address {
    /// Network name for all PTC addresses.
    pub const NETWORK: &'static str = "pactor";

    /// Wrap a callsign.
    pub fn new(callsign: impl Into<String>) -> Self {
        Self {
            callsign: callsign.into(),
        }
    }

    /// Network name.
    #[must_use]
    pub const fn network(&self) -> &'static str {
        Self::NETWORK
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.callsign)
    }
}
