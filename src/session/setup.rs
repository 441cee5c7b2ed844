//! Line-mode device setup run before entering hostmode.

use tracing::{debug, info, instrument};

use crate::protocol::{Error, PACTOR_CHANNEL, Result};
use crate::transport::FrameIo;

use super::config::{SessionConfig, load_init_script};

/// Prompt printed after every built-in setup command.
pub const PROMPT: &str = "cmd: ";

/// Prompt expected after init script lines.
pub const SCRIPT_PROMPT: &str = "cmd:";

/// Tuning commands used when no init script is configured.
pub const DEFAULT_TUNING: [&str; 2] = ["TONES 4", "PAC MON 0"];

fn expect(io: &mut FrameIo, command: &str, prompt: &str) -> Result<()> {
    io.write_expect(command, prompt)
        .map(drop)
        .map_err(|source| Error::Setup {
            command: command.to_owned(),
            source: Box::new(source),
        })
}

/// Commands sent before the tuning block, in order.
#[must_use]
pub fn preamble(local: &str) -> [String; 3] {
    [
        "QUIT".to_owned(),
        format!("MY {local}"),
        format!("PTCH {PACTOR_CHANNEL}"),
    ]
}

/// Bring a freshly opened modem into a known state: leave any previous
/// mode, set the callsign and channel, apply tuning.
#[instrument(level = "info", skip_all, fields(local = %config.local))]
pub fn configure(io: &mut FrameIo, config: &SessionConfig) -> Result<()> {
    for command in preamble(&config.local) {
        expect(io, &command, PROMPT)?;
    }

    match &config.init_script {
        None => {
            for command in DEFAULT_TUNING {
                expect(io, command, PROMPT)?;
            }
        }
        Some(path) => {
            let commands = load_init_script(path)?;
            debug!(path = %path.display(), lines = commands.len(), "running init script");
            for command in &commands {
                expect(io, command, SCRIPT_PROMPT)?;
            }
        }
    }

    info!("device configured");
    Ok(())
}
