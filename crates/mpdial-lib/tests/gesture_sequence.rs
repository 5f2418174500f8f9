//! Integration tests: dial gesture sequences through the monitor loop.
//!
//! These tests exercise the full event → interpreter → player → LED path
//! using the scripted mock dial and the in-memory mock player, verifying
//! that commands and LED writes happen in the right order through the
//! public API.

use std::sync::atomic::AtomicBool;
use std::time::{Duration, SystemTime};

use mpdial_lib::MpdialError;
use mpdial_lib::device::mock::{MockPowermate, MockStep};
use mpdial_lib::device::{DialEvent, DialInput};
use mpdial_lib::gesture::GestureInterpreter;
use mpdial_lib::led::LedState;
use mpdial_lib::monitor;
use mpdial_lib::player::PlayerState;
use mpdial_lib::player::mock::{MockPlayer, PlayerCommand};

const POLL: Duration = Duration::from_secs(10);

fn base() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)
}

fn rotate(ms: u64, delta: i32) -> DialEvent {
    DialEvent::new(DialInput::Rotation(delta), base() + Duration::from_millis(ms))
}

fn down(ms: u64) -> DialEvent {
    DialEvent::new(DialInput::ButtonDown, base() + Duration::from_millis(ms))
}

fn up(ms: u64) -> DialEvent {
    DialEvent::new(DialInput::ButtonUp, base() + Duration::from_millis(ms))
}

/// Run the monitor loop over a scripted device until the script runs out
/// (which surfaces as a fatal device error, ending the loop).
fn drive(
    script: Vec<MockStep>,
    player: &mut MockPlayer,
    interp: &mut GestureInterpreter,
) -> MockPowermate {
    let mut device = MockPowermate::new(script);
    let running = AtomicBool::new(true);
    let result = monitor::run(&mut device, player, interp, POLL, &running);
    assert!(
        matches!(result, Err(MpdialError::Device(_))),
        "loop ends only on the scripted device failure"
    );
    device
}

// ── Volume ──

#[test]
fn rotation_while_released_maps_one_to_one_onto_volume_changes() {
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();

    drive(
        vec![MockStep::Batch(vec![rotate(0, 3), rotate(5, -2)])],
        &mut player,
        &mut interp,
    );

    assert_eq!(
        player.log,
        vec![
            PlayerCommand::ChangeVolume(3),
            PlayerCommand::ChangeVolume(-2)
        ],
        "magnitudes pass through exactly, never coalesced"
    );
    assert_eq!(player.volume, 51);
}

// ── Hold-rotation (track skipping) ──

#[test]
fn hold_rotation_skips_once_and_swallows_the_release() {
    // Button held 500 ms with two rotation ticks (+3 then -2): the first
    // tick is suppressed by the parity filter, the second acts, and the
    // release must not toggle pause.
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();

    drive(
        vec![MockStep::Batch(vec![
            down(0),
            rotate(100, 3),
            rotate(200, -2),
            up(500),
        ])],
        &mut player,
        &mut interp,
    );

    assert_eq!(player.track_changes(), 1, "exactly one track change per hold");
    assert_eq!(player.log, vec![PlayerCommand::Previous]);
    assert!(
        !player.log.contains(&PlayerCommand::TogglePause),
        "the rotation consumed the hold; release is not a tap"
    );
}

#[test]
fn parity_filter_fires_on_every_second_tick() {
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();

    let mut events = vec![down(0)];
    for i in 0..8 {
        events.push(rotate(100 + i * 10, 1));
    }
    events.push(up(900));

    drive(vec![MockStep::Batch(events)], &mut player, &mut interp);

    assert_eq!(player.track_changes(), 4, "ticks 2, 4, 6 and 8 act");
    assert!(player.log.iter().all(|c| *c == PlayerCommand::Next));
}

// ── Tap and hold ──

#[test]
fn tap_toggles_pause_and_led_pulses() {
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();

    let device = drive(
        vec![MockStep::Batch(vec![down(0), up(500)])],
        &mut player,
        &mut interp,
    );

    assert_eq!(player.log, vec![PlayerCommand::TogglePause]);
    assert_eq!(player.state, PlayerState::Paused);
    assert_eq!(
        device.led_writes,
        vec![LedState::PausedPulsing.command()]
    );
    assert!(interp.paused_local());
}

#[test]
fn hold_boundary_is_strictly_greater_than_one_second() {
    // Exactly 1.000 s: tap.
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();
    drive(
        vec![MockStep::Batch(vec![down(0), up(1000)])],
        &mut player,
        &mut interp,
    );
    assert_eq!(player.log, vec![PlayerCommand::TogglePause]);

    // 1.001 s: hold; the playing player is stopped.
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();
    let device = drive(
        vec![MockStep::Batch(vec![down(0), up(1001)])],
        &mut player,
        &mut interp,
    );
    assert_eq!(player.log, vec![PlayerCommand::Stop]);
    assert_eq!(device.led_writes, vec![LedState::Stopped.command()]);
}

// ── Poll resync ──

#[test]
fn timer_resync_forces_pause_belief_and_led() {
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();

    // Tap first so the local pause belief is set...
    drive(
        vec![MockStep::Batch(vec![down(0), up(300)])],
        &mut player,
        &mut interp,
    );
    assert!(interp.paused_local());

    // ...then the player is stopped behind the daemon's back, and the next
    // poll timeout must force everything back in line.
    player.state = PlayerState::Stopped;
    let device = drive(vec![MockStep::Timeout], &mut player, &mut interp);

    assert_eq!(device.led_writes, vec![LedState::Stopped.command()]);
    assert!(!interp.paused_local());
}

#[test]
fn back_to_back_resyncs_write_the_same_led_command() {
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();

    let device = drive(
        vec![MockStep::Timeout, MockStep::Timeout],
        &mut player,
        &mut interp,
    );

    assert_eq!(device.led_writes.len(), 2);
    assert_eq!(device.led_writes[0], device.led_writes[1]);
}

// ── Startup ──

#[test]
fn startup_with_paused_player_resumes_and_lights_up() {
    let mut device = MockPowermate::new(vec![]);
    let mut player = MockPlayer::new(PlayerState::Paused);
    let mut interp = GestureInterpreter::new();

    monitor::sync_led_at_startup(&mut device, &mut player, &mut interp).unwrap();

    assert_eq!(player.log, vec![PlayerCommand::TogglePause]);
    assert_eq!(player.state, PlayerState::Playing);
    assert_eq!(device.led_writes, vec![LedState::Playing.command()]);
}

#[test]
fn startup_with_unreachable_player_is_fatal() {
    let mut device = MockPowermate::new(vec![]);
    let mut player = MockPlayer::new(PlayerState::Playing);
    player.offline = true;
    let mut interp = GestureInterpreter::new();

    let result = monitor::sync_led_at_startup(&mut device, &mut player, &mut interp);

    assert!(matches!(result, Err(MpdialError::Player(_))));
    assert!(device.led_writes.is_empty());
}

// ── Failure behavior ──

#[test]
fn lost_device_ends_the_loop_without_player_contact() {
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();

    drive(vec![], &mut player, &mut interp);

    assert!(player.log.is_empty());
}

#[test]
fn player_outage_no_ops_gestures_until_it_recovers() {
    let mut player = MockPlayer::new(PlayerState::Playing);
    let mut interp = GestureInterpreter::new();

    // Outage: the gesture is dropped, the loop survives.
    player.offline = true;
    drive(
        vec![MockStep::Batch(vec![rotate(0, 2)])],
        &mut player,
        &mut interp,
    );
    assert!(player.log.is_empty());

    // Connectivity returns: the next gesture just works — no reconnect
    // state machine involved.
    player.offline = false;
    drive(
        vec![MockStep::Batch(vec![rotate(0, 2)])],
        &mut player,
        &mut interp,
    );
    assert_eq!(player.log, vec![PlayerCommand::ChangeVolume(2)]);
}
