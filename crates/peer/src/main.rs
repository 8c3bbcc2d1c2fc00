//! Entry point for `peerball`.
//!
//! Parses CLI arguments, opens a UDP session in host or join mode and runs it
//! until `quit`, end of input, or the peer goes away. Movement keys are read
//! from stdin one per line (`ArrowUp`, `w`, ...). Set `RUST_LOG` to control
//! verbosity.

use std::io::BufRead;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use peerball_peer::input::Command;
use peerball_peer::runtime::{PeerHandle, PeerSession, SessionReport};
use peerball_peer::sync::SyncPolicy;
use peerball_peer::transport::UdpTransport;
use peerball_peer::{CONNECT_TIMEOUT_MS, Frame, PeerConfig, PeerError, TICK_RATE_HZ};
use tokio::sync::watch;

/// Two-player peer-to-peer ball game.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Simulation ticks per second.
    #[arg(
        long,
        default_value_t = TICK_RATE_HZ,
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    tick_rate: u32,

    /// Who broadcasts which body and who decides goals.
    #[arg(long, value_enum, default_value_t = PolicyArg::Symmetric, global = true)]
    policy: PolicyArg,

    /// How long `host` waits for a peer.
    #[arg(long, default_value_t = CONNECT_TIMEOUT_MS, global = true)]
    connect_timeout_ms: u64,
}

#[derive(Subcommand)]
enum Mode {
    /// Wait for a peer and play as player1.
    Host {
        /// Local address to bind (e.g. 0.0.0.0:9000).
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
    },
    /// Connect to a host and play as player2.
    Join {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
        /// Host address (e.g. 127.0.0.1:9000).
        #[arg(short, long)]
        peer: SocketAddr,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Symmetric,
    HostAuthoritative,
}

impl From<PolicyArg> for SyncPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Symmetric => SyncPolicy::Symmetric,
            PolicyArg::HostAuthoritative => SyncPolicy::HostAuthoritative,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let config = PeerConfig {
        tick_rate_hz: cli.tick_rate,
        connect_timeout_ms: cli.connect_timeout_ms,
        policy: cli.policy.into(),
        ..Default::default()
    };

    match play(cli.mode, config).await {
        Ok(report) => {
            log::info!(
                "final score {}-{} after {} ticks",
                report.score.player1,
                report.score.player2,
                report.ticks
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn play(mode: Mode, config: PeerConfig) -> Result<SessionReport, PeerError> {
    let (session, handle) = match mode {
        Mode::Host { bind } => {
            let timeout = Duration::from_millis(config.connect_timeout_ms);
            log::info!("waiting for a peer on {bind}");
            let transport = UdpTransport::listen(bind, timeout).await?;
            PeerSession::accept(config, transport)?
        }
        Mode::Join { bind, peer } => {
            log::info!("joining {peer}");
            let transport = UdpTransport::connect(bind, peer).await?;
            PeerSession::initiate(config, transport)?
        }
    };

    tokio::spawn(report_score(handle.frames()));
    std::thread::spawn(move || read_commands(handle));
    session.run().await
}

/// Forward stdin lines as key presses. `quit` or end of input shuts down.
///
/// Runs on its own thread: a blocking stdin read would otherwise hold up
/// runtime shutdown after the session ends.
fn read_commands(handle: PeerHandle) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("stdin: {err}");
                break;
            }
        };
        let key = line.trim();
        if key == "quit" {
            break;
        }
        if key.is_empty() {
            continue;
        }
        match Command::from_key(key) {
            Some(command) => {
                if !handle.press(command) {
                    return;
                }
            }
            None => log::warn!("ignoring unknown key {key:?}"),
        }
    }
    handle.shutdown();
}

/// Log the score whenever it changes.
async fn report_score(mut frames: watch::Receiver<Frame>) {
    let mut last = frames.borrow().score;
    while frames.changed().await.is_ok() {
        let score = frames.borrow_and_update().score;
        if score != last {
            log::info!("score {}-{}", score.player1, score.player2);
            last = score;
        }
    }
}
