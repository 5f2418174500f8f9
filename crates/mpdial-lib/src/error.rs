//! Unified error type for the mpdial-lib crate.
//!
//! [`MpdialError`] wraps module-specific errors (`DeviceError`, `PlayerError`).
//! `From` impls allow `?` to propagate across module boundaries seamlessly.

use std::fmt;

use crate::device::DeviceError;
use crate::player::PlayerError;

/// Unified error type for mpdial-lib operations.
#[derive(Debug)]
pub enum MpdialError {
    /// Input-device error (locate, event read, LED write).
    Device(DeviceError),
    /// MPD client error (connect, command).
    Player(PlayerError),
}

impl fmt::Display for MpdialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MpdialError::Device(e) => write!(f, "{e}"),
            MpdialError::Player(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MpdialError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MpdialError::Device(e) => Some(e),
            MpdialError::Player(e) => Some(e),
        }
    }
}

impl From<DeviceError> for MpdialError {
    fn from(e: DeviceError) -> Self {
        MpdialError::Device(e)
    }
}

impl From<PlayerError> for MpdialError {
    fn from(e: PlayerError) -> Self {
        MpdialError::Player(e)
    }
}

/// Crate-level Result alias using [`MpdialError`].
pub type Result<T> = std::result::Result<T, MpdialError>;
