//! mpdial — bridge a Griffin PowerMate dial to the Music Player Daemon.
//!
//! Rotation changes the volume; rotation with the button held skips tracks;
//! a short tap toggles pause and a long hold toggles play/stop. The knob LED
//! mirrors playback state. Runs as a daemon unless `--debug` keeps it in the
//! foreground.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use mpdial_lib::config::{self, Config};
use mpdial_lib::device;
use mpdial_lib::gesture::GestureInterpreter;
use mpdial_lib::monitor;
use mpdial_lib::player::MpdPlayer;

/// Shared shutdown flag — set by the termination-signal handler, checked at
/// the top of every monitor-loop iteration.
static RUNNING: AtomicBool = AtomicBool::new(true);

#[derive(Parser)]
#[command(
    name = "mpdial",
    version,
    about = "Griffin PowerMate control for the Music Player Daemon"
)]
struct Args {
    /// Stay in the foreground and log event processing
    #[arg(short, long)]
    debug: bool,

    /// MPD host address
    #[arg(long, default_value = config::DEFAULT_HOST)]
    host: String,

    /// MPD port
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Seconds between MPD status polls (minimum 10)
    #[arg(short = 'P', long, default_value_t = 10)]
    poll: u64,

    /// PID file written when running as a daemon
    #[arg(long, default_value = "/run/mpdial.pid")]
    pid_file: PathBuf,

    /// Log file used when running as a daemon
    #[arg(long, default_value = "/var/log/mpdial.log")]
    log_file: PathBuf,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::new(args.host, args.port, args.poll, args.debug);
    log::info!(
        "MPD {}:{}, polling every {}s",
        cfg.host,
        cfg.port,
        cfg.poll_interval.as_secs()
    );

    // Device first: no point dialing MPD without a dial.
    let mut dial = device::open_device()?;
    let mut player = MpdPlayer::new(cfg.host.clone(), cfg.port);
    let mut interp = GestureInterpreter::new();

    monitor::sync_led_at_startup(&mut dial, &mut player, &mut interp)?;

    // Fork before installing the signal handler; handler threads would not
    // survive the fork.
    let _pid_guard = if cfg.debug {
        None
    } else {
        Some(daemonize(&args.pid_file, &args.log_file)?)
    };

    ctrlc::set_handler(|| RUNNING.store(false, Ordering::SeqCst)).ok();

    monitor::run(&mut dial, &mut player, &mut interp, cfg.poll_interval, &RUNNING)?;
    log::info!("shutting down");
    Ok(())
}

/// Removes the pid file once the process leaves the monitor loop.
struct PidFileGuard {
    path: PathBuf,
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn daemonize(pid_file: &Path, log_file: &Path) -> Result<PidFileGuard, Box<dyn std::error::Error>> {
    let stderr = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    daemonize::Daemonize::new()
        .pid_file(pid_file)
        .working_directory("/")
        .stderr(stderr)
        .start()?;
    log::info!("daemon started");
    Ok(PidFileGuard {
        path: pid_file.to_path_buf(),
    })
}

#[cfg(not(unix))]
fn daemonize(pid_file: &Path, _log_file: &Path) -> Result<PidFileGuard, Box<dyn std::error::Error>> {
    log::warn!("daemon mode is not supported on this platform; running in the foreground");
    Ok(PidFileGuard {
        path: pid_file.to_path_buf(),
    })
}
