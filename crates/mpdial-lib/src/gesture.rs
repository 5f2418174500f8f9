//! Dial gesture interpreter — session state transitions decoupled from I/O.
//!
//! `GestureInterpreter` owns the session flags and turns one dial event at a
//! time into player commands plus an optional LED update for the caller to
//! apply. Player access goes through the [`PlayerControl`] trait, so the
//! whole machine runs against mocks in tests; the monitor loop is a thin
//! adapter wiring the real device and client to it.

use std::time::{Duration, SystemTime};

use crate::device::{DialEvent, DialInput};
use crate::led::LedState;
use crate::player::{PlayerControl, PlayerState, Result};

/// A press held no longer than this is a tap; strictly longer is a hold.
const TAP_LIMIT: Duration = Duration::from_secs(1);

/// Session state machine for the dial.
#[derive(Debug, Default)]
pub struct GestureInterpreter {
    /// True while the knob button is physically depressed.
    button_held: bool,
    /// A rotation acted during the current hold; suppresses the tap action
    /// on release.
    rotation_consumed: bool,
    /// Local belief about the remote pause state. Not authoritative — forced
    /// to the real state on every poll resync.
    paused_local: bool,
    /// Flips on each held rotation; only the settled phase acts.
    rotation_parity: bool,
    /// When the current hold began.
    button_down_at: Option<SystemTime>,
}

impl GestureInterpreter {
    pub fn new() -> Self {
        GestureInterpreter::default()
    }

    pub fn paused_local(&self) -> bool {
        self.paused_local
    }

    pub fn button_held(&self) -> bool {
        self.button_held
    }

    /// Feed one device event. Returns the LED state to apply, if any.
    ///
    /// A player error aborts the interaction; local flags recorded before
    /// the failing call keep their new values, so the machine stays
    /// consistent with what the user physically did.
    pub fn handle_event(
        &mut self,
        ev: &DialEvent,
        player: &mut impl PlayerControl,
    ) -> Result<Option<LedState>> {
        match ev.input {
            DialInput::Rotation(delta) => self.on_rotation(delta, player),
            DialInput::ButtonDown => {
                log::debug!("button down");
                self.button_held = true;
                self.button_down_at = Some(ev.time);
                Ok(None)
            }
            DialInput::ButtonUp => self.on_release(ev.time, player),
        }
    }

    fn on_rotation(
        &mut self,
        delta: i32,
        player: &mut impl PlayerControl,
    ) -> Result<Option<LedState>> {
        if !self.button_held {
            log::debug!("volume change {delta:+}");
            player.change_volume(delta)?;
            return Ok(None);
        }

        // The dial is too sensitive for track skipping: act on every second
        // tick while the button is held.
        self.rotation_parity = !self.rotation_parity;
        if self.rotation_parity {
            return Ok(None);
        }

        self.rotation_consumed = true;
        if delta > 0 {
            log::debug!("next track");
            player.next()?;
        } else if delta < 0 {
            log::debug!("previous track");
            player.previous()?;
        }
        Ok(None)
    }

    fn on_release(
        &mut self,
        at: SystemTime,
        player: &mut impl PlayerControl,
    ) -> Result<Option<LedState>> {
        self.button_held = false;
        let down_at = self.button_down_at.take();

        if self.rotation_consumed {
            // A rotation already acted during this hold; the release itself
            // is not a tap.
            log::debug!("release after track change");
            self.rotation_consumed = false;
            return Ok(None);
        }

        let held = down_at
            .and_then(|down| at.duration_since(down).ok())
            .unwrap_or_default();
        if held > TAP_LIMIT {
            self.on_long_hold(player)
        } else {
            self.on_tap(player)
        }
    }

    /// Long hold: toggle between play and stop, querying the player first so
    /// the LED lands on the real outcome.
    fn on_long_hold(&mut self, player: &mut impl PlayerControl) -> Result<Option<LedState>> {
        log::debug!("long hold");
        match player.query_state()? {
            PlayerState::Stopped => {
                player.play()?;
                Ok(Some(LedState::Playing))
            }
            PlayerState::Playing => {
                player.stop()?;
                Ok(Some(LedState::Stopped))
            }
            PlayerState::Paused => {
                player.toggle_pause()?;
                Ok(None)
            }
            PlayerState::Unknown => Ok(None),
        }
    }

    /// Short tap: toggle pause, tracking the new state optimistically for
    /// the LED choice.
    fn on_tap(&mut self, player: &mut impl PlayerControl) -> Result<Option<LedState>> {
        log::debug!("tap");
        player.toggle_pause()?;
        self.paused_local = !self.paused_local;
        Ok(Some(if self.paused_local {
            LedState::PausedPulsing
        } else {
            LedState::PausedSteady
        }))
    }

    /// Force the local pause belief and the LED to the authoritative player
    /// state. Called on every poll timeout; corrects any drift left by the
    /// optimistic updates above.
    pub fn resync(&mut self, state: PlayerState) -> Option<LedState> {
        match state {
            PlayerState::Stopped => {
                self.paused_local = false;
                Some(LedState::Stopped)
            }
            PlayerState::Playing => {
                self.paused_local = false;
                Some(LedState::Playing)
            }
            PlayerState::Paused => {
                self.paused_local = true;
                Some(LedState::PausedPulsing)
            }
            PlayerState::Unknown => None,
        }
    }

    /// One-shot startup synchronization: mirror the player state on the LED,
    /// resuming playback first if the player was left paused.
    pub fn initial_sync(&mut self, player: &mut impl PlayerControl) -> Result<Option<LedState>> {
        match player.query_state()? {
            PlayerState::Stopped => Ok(Some(LedState::Stopped)),
            PlayerState::Playing => Ok(Some(LedState::Playing)),
            PlayerState::Paused => {
                player.toggle_pause()?;
                self.paused_local = false;
                Ok(Some(LedState::Playing))
            }
            PlayerState::Unknown => Ok(None),
        }
    }
}
