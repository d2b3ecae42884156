//! Tracing subscriber setup for binaries and tests embedding the engine.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the host.

use crate::core::{Error, Result};
use tracing::Level;

/// Install a stdout fmt subscriber at `level`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Parse a level name such as `info` or `DEBUG`.
pub fn parse_level(name: &str) -> Result<Level> {
    name.trim()
        .parse::<Level>()
        .map_err(|_| Error::Config(format!("unknown log level '{}'", name)))
}
