//! Resolved runtime configuration.
//!
//! The binary resolves arguments into a [`Config`] and threads it by value
//! into the startup sequence and the monitor loop. Nothing in the library
//! reads process-wide state.

use std::time::Duration;

/// Default MPD host (IPv6 loopback).
pub const DEFAULT_HOST: &str = "::1";

/// Default MPD port.
pub const DEFAULT_PORT: u16 = 6600;

/// Floor for the status-poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Config {
    /// MPD host address.
    pub host: String,
    /// MPD port.
    pub port: u16,
    /// Time between status polls; never below [`MIN_POLL_INTERVAL`].
    pub poll_interval: Duration,
    /// Foreground mode with event-level logging.
    pub debug: bool,
}

impl Config {
    /// Build a config, flooring the poll interval at [`MIN_POLL_INTERVAL`].
    pub fn new(host: impl Into<String>, port: u16, poll_secs: u64, debug: bool) -> Self {
        Config {
            host: host.into(),
            port,
            poll_interval: Duration::from_secs(poll_secs).max(MIN_POLL_INTERVAL),
            debug,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_HOST, DEFAULT_PORT, MIN_POLL_INTERVAL.as_secs(), false)
    }
}
