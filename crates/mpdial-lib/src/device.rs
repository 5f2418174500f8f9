//! PowerMate device access — trait + Linux evdev backend.

use std::fmt;
use std::time::{Duration, SystemTime};

use crate::led::LedCommand;

// ── Error type ──

/// Device communication errors.
#[derive(Debug)]
pub enum DeviceError {
    /// No event device with a recognized name prefix was found.
    NotFound,
    /// The device file failed to open, read, or write. During the monitor
    /// loop this means the device is gone and the process must exit.
    Io(std::io::Error),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotFound => write!(f, "PowerMate device not found"),
            DeviceError::Io(e) => write!(f, "device I/O: {e}"),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Io(e) => Some(e),
            DeviceError::NotFound => None,
        }
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(e: std::io::Error) -> Self {
        DeviceError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Input events ──

/// One decoded input from the dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialInput {
    /// Dial turned; positive is clockwise.
    Rotation(i32),
    ButtonDown,
    ButtonUp,
}

/// A dial input with its kernel timestamp.
#[derive(Debug, Clone, Copy)]
pub struct DialEvent {
    pub input: DialInput,
    pub time: SystemTime,
}

impl DialEvent {
    pub fn new(input: DialInput, time: SystemTime) -> Self {
        DialEvent { input, time }
    }
}

// ── Trait ──

pub trait PowermateDevice {
    /// Wait until the device has events pending or `timeout` elapses.
    /// Returns `false` on timeout. An interrupted wait counts as a timeout
    /// so the caller's cancellation flag gets rechecked.
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool>;

    /// Read every event currently pending, in arrival order. Blocks if none
    /// are pending. An error means the device is lost.
    fn read_batch(&mut self) -> Result<Vec<DialEvent>>;

    /// Write an LED command. Best-effort: callers log failures and carry on.
    fn write_led(&mut self, command: LedCommand) -> Result<()>;
}

// ── Device identification ──

/// Bounded range of event-device files scanned by `locate`.
const NUM_EVENT_DEVICES: usize = 16;

/// Accepted device-name prefixes. The SoundKnob is the OEM variant of the
/// same hardware.
const VALID_PREFIXES: [&str; 2] = ["Griffin PowerMate", "Griffin SoundKnob"];

/// True if `name` starts with a recognized prefix, compared ASCII
/// case-insensitively up to the prefix length.
fn name_matches(name: &str) -> bool {
    VALID_PREFIXES.iter().any(|prefix| {
        name.len() >= prefix.len()
            && name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    })
}

// ── Linux implementation ──

#[cfg(target_os = "linux")]
mod linux_impl {
    use std::os::fd::{AsRawFd, BorrowedFd};

    use evdev::{Device, EventType, InputEvent, InputEventKind, Key, MiscType, RelativeAxisType};
    use nix::errno::Errno;
    use nix::poll::{PollFd, PollFlags, poll};

    use super::*;

    pub struct EvdevPowermate {
        device: Device,
    }

    impl EvdevPowermate {
        /// Scan the event-device range and open the first device whose
        /// declared name carries a recognized prefix.
        pub fn locate() -> Result<Self> {
            for i in 0..NUM_EVENT_DEVICES {
                let path = format!("/dev/input/event{i}");
                match Self::open(&path) {
                    Ok(dev) => {
                        log::info!("found PowerMate at {path}");
                        return Ok(dev);
                    }
                    Err(e) => log::debug!("{path}: {e}"),
                }
            }
            Err(DeviceError::NotFound)
        }

        fn open(path: &str) -> Result<Self> {
            let device = Device::open(path)?;
            let name = device.name().unwrap_or_default();
            if !name_matches(name) {
                return Err(DeviceError::NotFound);
            }
            Ok(EvdevPowermate { device })
        }
    }

    impl PowermateDevice for EvdevPowermate {
        fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
            // SAFETY: the fd is owned by `self.device`, which outlives the
            // poll call.
            let fd = unsafe { BorrowedFd::borrow_raw(self.device.as_raw_fd()) };
            let mut fds = [PollFd::new(&fd, PollFlags::POLLIN)];
            let millis = timeout.as_millis().min(i32::MAX as u128) as nix::libc::c_int;
            match poll(&mut fds, millis) {
                Ok(0) => Ok(false),
                Ok(_) => Ok(true),
                Err(Errno::EINTR) => Ok(false),
                Err(e) => Err(DeviceError::Io(std::io::Error::from_raw_os_error(
                    e as i32,
                ))),
            }
        }

        fn read_batch(&mut self) -> Result<Vec<DialEvent>> {
            let mut batch = Vec::new();
            let events = match self.device.fetch_events() {
                Ok(events) => events,
                // Readiness raced with another reader; nothing pending is
                // not a lost device.
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(batch),
                Err(e) => return Err(DeviceError::Io(e)),
            };
            for ev in events {
                let input = match ev.kind() {
                    InputEventKind::RelAxis(RelativeAxisType::REL_DIAL) => {
                        DialInput::Rotation(ev.value())
                    }
                    InputEventKind::Key(Key::BTN_0) => match ev.value() {
                        1 => DialInput::ButtonDown,
                        0 => DialInput::ButtonUp,
                        _ => continue, // key autorepeat
                    },
                    _ => continue, // SYN frames and anything unmapped
                };
                batch.push(DialEvent::new(input, ev.timestamp()));
            }
            Ok(batch)
        }

        fn write_led(&mut self, command: LedCommand) -> Result<()> {
            let ev = InputEvent::new(EventType::MISC, MiscType::MSC_PULSELED.0, command.pack());
            self.device.send_events(&[ev]).map_err(DeviceError::Io)
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux_impl::EvdevPowermate;

// ── Stub device for unsupported platforms ──

/// Placeholder device that always reports `NotFound`.
/// Enables compilation and `cargo test` on hosts without evdev.
#[cfg(not(target_os = "linux"))]
pub struct StubPowermate;

#[cfg(not(target_os = "linux"))]
impl StubPowermate {
    pub fn locate() -> Result<Self> {
        Err(DeviceError::NotFound)
    }
}

#[cfg(not(target_os = "linux"))]
impl PowermateDevice for StubPowermate {
    fn wait_readable(&mut self, _timeout: Duration) -> Result<bool> {
        unreachable!()
    }
    fn read_batch(&mut self) -> Result<Vec<DialEvent>> {
        unreachable!()
    }
    fn write_led(&mut self, _command: LedCommand) -> Result<()> {
        unreachable!()
    }
}

/// Concrete device type for the current platform.
#[cfg(target_os = "linux")]
pub type PlatformDevice = EvdevPowermate;
#[cfg(not(target_os = "linux"))]
pub type PlatformDevice = StubPowermate;

/// Locate and open the PowerMate for the current platform.
pub fn open_device() -> Result<PlatformDevice> {
    PlatformDevice::locate()
}

// ── Mock device for testing ──

/// Scripted in-memory dial for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use std::collections::VecDeque;

    use super::*;

    /// One scripted step of device behavior.
    #[derive(Debug, Clone)]
    pub enum MockStep {
        /// `wait_readable` reports a timeout.
        Timeout,
        /// `wait_readable` reports readiness; the following `read_batch`
        /// returns these events.
        Batch(Vec<DialEvent>),
    }

    /// Scripted dial. When the script runs out, the next wait or read fails
    /// with an I/O error, which ends the monitor loop the same way a
    /// yanked cable would.
    pub struct MockPowermate {
        script: VecDeque<MockStep>,
        pending: Option<Vec<DialEvent>>,
        /// Every LED command written, in order.
        pub led_writes: Vec<LedCommand>,
        /// Make every LED write fail.
        pub fail_led_writes: bool,
        /// Timeouts passed to `wait_readable`, in order.
        pub waits: Vec<Duration>,
    }

    impl MockPowermate {
        pub fn new(script: Vec<MockStep>) -> Self {
            MockPowermate {
                script: script.into(),
                pending: None,
                led_writes: Vec::new(),
                fail_led_writes: false,
                waits: Vec::new(),
            }
        }

        fn exhausted() -> DeviceError {
            DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock: script exhausted",
            ))
        }
    }

    impl PowermateDevice for MockPowermate {
        fn wait_readable(&mut self, timeout: Duration) -> Result<bool> {
            self.waits.push(timeout);
            match self.script.pop_front() {
                Some(MockStep::Timeout) => Ok(false),
                Some(MockStep::Batch(events)) => {
                    self.pending = Some(events);
                    Ok(true)
                }
                None => Err(Self::exhausted()),
            }
        }

        fn read_batch(&mut self) -> Result<Vec<DialEvent>> {
            self.pending.take().ok_or_else(Self::exhausted)
        }

        fn write_led(&mut self, command: LedCommand) -> Result<()> {
            if self.fail_led_writes {
                return Err(Self::exhausted());
            }
            self.led_writes.push(command);
            Ok(())
        }
    }
}
