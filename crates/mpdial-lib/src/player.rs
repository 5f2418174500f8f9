//! MPD client adapter — one short-lived connection per interaction.
//!
//! Every call connects, performs a single exchange, and drops the
//! connection. Nothing is held between interactions, so a player restart
//! costs only the per-call connect latency and never requires a reconnect
//! state machine here.

use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use mpd::Client;
use mpd::status::State;

/// Connection-establishment timeout for each interaction.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ── Error type ──

/// Player communication errors.
///
/// Both variants are recoverable: the caller logs them and abandons the
/// current interaction. No retries are attempted anywhere.
#[derive(Debug)]
pub enum PlayerError {
    /// Could not reach the player (resolve, connect, handshake).
    Connection(String),
    /// The player rejected or failed a command.
    Command(String),
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerError::Connection(e) => write!(f, "mpd connection: {e}"),
            PlayerError::Command(e) => write!(f, "mpd command: {e}"),
        }
    }
}

impl std::error::Error for PlayerError {}

pub type Result<T> = std::result::Result<T, PlayerError>;

// ── Player state ──

/// Playback state as reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
    /// State the player reported but this client cannot interpret.
    Unknown,
}

// ── Trait ──

/// Control surface the rest of the crate programs against.
pub trait PlayerControl {
    fn query_state(&mut self) -> Result<PlayerState>;
    fn play(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn toggle_pause(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<()>;
    fn previous(&mut self) -> Result<()>;
    /// Adjust the volume by `delta` percentage points.
    fn change_volume(&mut self, delta: i32) -> Result<()>;
}

// ── MPD implementation ──

/// MPD control over one short-lived TCP connection per call.
pub struct MpdPlayer {
    host: String,
    port: u16,
}

impl MpdPlayer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        MpdPlayer {
            host: host.into(),
            port,
        }
    }

    fn connect(&self) -> Result<Client> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| {
                PlayerError::Connection(format!("resolve {}:{}: {e}", self.host, self.port))
            })?
            .next()
            .ok_or_else(|| {
                PlayerError::Connection(format!(
                    "resolve {}:{}: no addresses",
                    self.host, self.port
                ))
            })?;
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| PlayerError::Connection(format!("connect {addr}: {e}")))?;
        Client::new(stream).map_err(|e| PlayerError::Connection(format!("handshake: {e}")))
    }
}

fn command_err(e: mpd::error::Error) -> PlayerError {
    PlayerError::Command(e.to_string())
}

impl PlayerControl for MpdPlayer {
    fn query_state(&mut self) -> Result<PlayerState> {
        let mut client = self.connect()?;
        let status = client.status().map_err(command_err)?;
        Ok(match status.state {
            State::Stop => PlayerState::Stopped,
            State::Play => PlayerState::Playing,
            State::Pause => PlayerState::Paused,
        })
    }

    fn play(&mut self) -> Result<()> {
        self.connect()?.play().map_err(command_err)
    }

    fn stop(&mut self) -> Result<()> {
        self.connect()?.stop().map_err(command_err)
    }

    fn toggle_pause(&mut self) -> Result<()> {
        self.connect()?.toggle_pause().map_err(command_err)
    }

    fn next(&mut self) -> Result<()> {
        self.connect()?.next().map_err(command_err)
    }

    fn previous(&mut self) -> Result<()> {
        self.connect()?.prev().map_err(command_err)
    }

    fn change_volume(&mut self, delta: i32) -> Result<()> {
        // The protocol's relative form is not exposed by the client library;
        // read-modify-write against the absolute setter instead.
        let mut client = self.connect()?;
        let status = client.status().map_err(command_err)?;
        let current = i32::from(status.volume.max(0));
        let target = (current + delta).clamp(0, 100) as i8;
        client.volume(target).map_err(command_err)
    }
}

// ── Mock player for testing ──

/// In-memory player for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;

    /// One recorded player interaction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PlayerCommand {
        Play,
        Stop,
        TogglePause,
        Next,
        Previous,
        ChangeVolume(i32),
    }

    /// Tiny in-memory player: tracks playback state the way a real player
    /// would and records every command. `offline` makes every call fail with
    /// a connection error, as if the daemon lost the network.
    pub struct MockPlayer {
        pub state: PlayerState,
        pub volume: i32,
        pub log: Vec<PlayerCommand>,
        pub offline: bool,
    }

    impl MockPlayer {
        pub fn new(state: PlayerState) -> Self {
            MockPlayer {
                state,
                volume: 50,
                log: Vec::new(),
                offline: false,
            }
        }

        fn check_online(&self) -> Result<()> {
            if self.offline {
                Err(PlayerError::Connection("mock: connection refused".into()))
            } else {
                Ok(())
            }
        }

        /// Number of recorded track-change commands.
        pub fn track_changes(&self) -> usize {
            self.log
                .iter()
                .filter(|c| matches!(c, PlayerCommand::Next | PlayerCommand::Previous))
                .count()
        }
    }

    impl PlayerControl for MockPlayer {
        fn query_state(&mut self) -> Result<PlayerState> {
            self.check_online()?;
            Ok(self.state)
        }

        fn play(&mut self) -> Result<()> {
            self.check_online()?;
            self.state = PlayerState::Playing;
            self.log.push(PlayerCommand::Play);
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.check_online()?;
            self.state = PlayerState::Stopped;
            self.log.push(PlayerCommand::Stop);
            Ok(())
        }

        fn toggle_pause(&mut self) -> Result<()> {
            self.check_online()?;
            // Pause toggling on a stopped player is a no-op, as in MPD.
            self.state = match self.state {
                PlayerState::Playing => PlayerState::Paused,
                PlayerState::Paused => PlayerState::Playing,
                other => other,
            };
            self.log.push(PlayerCommand::TogglePause);
            Ok(())
        }

        fn next(&mut self) -> Result<()> {
            self.check_online()?;
            self.log.push(PlayerCommand::Next);
            Ok(())
        }

        fn previous(&mut self) -> Result<()> {
            self.check_online()?;
            self.log.push(PlayerCommand::Previous);
            Ok(())
        }

        fn change_volume(&mut self, delta: i32) -> Result<()> {
            self.check_online()?;
            self.volume = (self.volume + delta).clamp(0, 100);
            self.log.push(PlayerCommand::ChangeVolume(delta));
            Ok(())
        }
    }
}
