//! LED state encoding — playback feedback to PowerMate pulse commands.
//!
//! The PowerMate takes its LED command as a single packed word written back
//! through the event interface. The bit layout is a hardware contract:
//! brightness in the low byte, pulse speed shifted left 8, pulse table
//! shifted left 17, the asleep flag at bit 19 and the awake flag at bit 20.

/// Pulse speed ceiling accepted by the hardware.
pub const MAX_PULSE_SPEED: u16 = 510;

/// Highest pulse waveform table index.
pub const MAX_PULSE_TABLE: u8 = 2;

/// Pulse speed used for the paused indication.
const PAUSED_PULSE_SPEED: u16 = 260;

/// Abstract playback feedback shown on the knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    /// Player stopped: LED off.
    Stopped,
    /// Player playing: LED at full brightness.
    Playing,
    /// Leaving pause: same full brightness as [`LedState::Playing`].
    PausedSteady,
    /// Player paused: LED pulsing.
    PausedPulsing,
}

/// Device-level LED parameters, packed into one word before the write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedCommand {
    pub static_brightness: u8,
    pub pulse_speed: u16,
    pub pulse_table: u8,
    pub pulse_asleep: bool,
    pub pulse_awake: bool,
}

impl LedState {
    /// Device parameters for this feedback state.
    pub fn command(self) -> LedCommand {
        match self {
            LedState::Stopped => LedCommand::default(),
            LedState::Playing | LedState::PausedSteady => LedCommand {
                static_brightness: 255,
                ..LedCommand::default()
            },
            LedState::PausedPulsing => LedCommand {
                pulse_speed: PAUSED_PULSE_SPEED,
                pulse_awake: true,
                ..LedCommand::default()
            },
        }
    }
}

impl LedCommand {
    /// Pack into the device's command word, clamping each field to the range
    /// the hardware accepts.
    pub fn pack(&self) -> i32 {
        let speed = i32::from(self.pulse_speed.min(MAX_PULSE_SPEED));
        let table = i32::from(self.pulse_table.min(MAX_PULSE_TABLE));
        i32::from(self.static_brightness)
            | (speed << 8)
            | (table << 17)
            | (i32::from(self.pulse_asleep) << 19)
            | (i32::from(self.pulse_awake) << 20)
    }
}
