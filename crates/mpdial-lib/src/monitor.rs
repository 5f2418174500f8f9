//! Monitor loop — cadence between dial events and MPD status polls.
//!
//! Single-threaded: each iteration makes one multiplexed wait (device
//! readiness or the poll timer) and then either drains the pending events in
//! arrival order or resynchronizes LED and pause belief against the player.
//! Player trouble is logged and the interaction dropped; device trouble ends
//! the loop. A player call blocks the whole iteration — acceptable for a
//! knob, and it keeps every interaction strictly sequential.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::device::PowermateDevice;
use crate::error::Result;
use crate::gesture::GestureInterpreter;
use crate::led::LedState;
use crate::player::PlayerControl;

/// Write `state` to the LED, logging and swallowing failures.
fn apply_led(device: &mut impl PowermateDevice, state: LedState) {
    if let Err(e) = device.write_led(state.command()) {
        log::warn!("LED write failed: {e}");
    }
}

/// One-shot startup synchronization of the LED against the player.
///
/// A player failure here is fatal: without an answer the LED would start out
/// lying about the playback state.
pub fn sync_led_at_startup(
    device: &mut impl PowermateDevice,
    player: &mut impl PlayerControl,
    interp: &mut GestureInterpreter,
) -> Result<()> {
    if let Some(state) = interp.initial_sync(player)? {
        apply_led(device, state);
    }
    Ok(())
}

/// Run the monitor loop until `running` clears or the device fails.
///
/// The cancellation flag is checked at the top of every iteration, so a
/// termination signal is observed at the next wakeup — at most one poll
/// interval later.
pub fn run(
    device: &mut impl PowermateDevice,
    player: &mut impl PlayerControl,
    interp: &mut GestureInterpreter,
    poll_interval: Duration,
    running: &AtomicBool,
) -> Result<()> {
    while running.load(Ordering::SeqCst) {
        if !device.wait_readable(poll_interval)? {
            // Timer expiry: the player is the authority; correct any drift
            // left by optimistic updates.
            log::debug!("poll timeout");
            match player.query_state() {
                Ok(state) => {
                    if let Some(led) = interp.resync(state) {
                        apply_led(device, led);
                    }
                }
                Err(e) => log::warn!("status poll failed: {e}"),
            }
            continue;
        }

        for ev in device.read_batch()? {
            match interp.handle_event(&ev, player) {
                Ok(Some(led)) => apply_led(device, led),
                Ok(None) => {}
                Err(e) => log::warn!("interaction dropped: {e}"),
            }
        }
    }
    Ok(())
}
