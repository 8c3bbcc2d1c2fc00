//! Session event loop.
//!
//! A [`PeerSession`] owns an [`Endpoint`] and one [`Transport`] and drives
//! them from a single task: a fixed-cadence tick, inbound payloads and
//! control messages are interleaved with `tokio::select!`, so nothing else
//! ever touches the store. The world and the transport live inside the
//! `run` future and are released on every exit path.

use std::time::Duration;

use peerball_sim::{Score, Tick};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::input::Command;
use crate::session::Role;
use crate::transport::{Transport, TransportError};
use crate::{Endpoint, Frame, PeerConfig, PeerError};

/// Messages from the handle to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Input(Command),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Shut down locally, or every handle was dropped.
    Shutdown,
    /// The peer closed the transport.
    PeerClosed,
}

/// Summary returned when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub ticks: Tick,
    pub score: Score,
    pub exit: ExitReason,
}

/// Input injection, shutdown and per-tick frames for a running session.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    controls: mpsc::UnboundedSender<Control>,
    frames: watch::Receiver<Frame>,
}

impl PeerHandle {
    /// Queue a command. `false` once the session has ended.
    pub fn press(&self, command: Command) -> bool {
        self.controls.send(Control::Input(command)).is_ok()
    }

    /// Queue the command bound to `key`. `false` for keys outside the four
    /// directions, or once the session has ended.
    pub fn press_key(&self, key: &str) -> bool {
        match Command::from_key(key) {
            Some(command) => self.press(command),
            None => false,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.controls.send(Control::Shutdown);
    }

    /// The most recent frame.
    pub fn frame(&self) -> Frame {
        self.frames.borrow().clone()
    }

    /// A receiver notified once per tick.
    pub fn frames(&self) -> watch::Receiver<Frame> {
        self.frames.clone()
    }
}

pub struct PeerSession<T> {
    endpoint: Endpoint,
    transport: T,
    controls: mpsc::UnboundedReceiver<Control>,
    frames: watch::Sender<Frame>,
    /// Sent before the first tick.
    outbox: Vec<Vec<u8>>,
}

impl<T: Transport> PeerSession<T> {
    /// Session on a connection the peer opened. This endpoint plays player1.
    pub fn accept(config: PeerConfig, transport: T) -> Result<(Self, PeerHandle), PeerError> {
        let mut endpoint = Endpoint::new(config);
        endpoint.accept_connection(&transport.id())?;
        Ok(Self::with_endpoint(endpoint, transport, Vec::new()))
    }

    /// Session on a connection this endpoint opened. This endpoint plays
    /// player2 and sends its bootstrap snapshot first.
    pub fn initiate(config: PeerConfig, transport: T) -> Result<(Self, PeerHandle), PeerError> {
        let mut endpoint = Endpoint::new(config);
        let bootstrap = endpoint.open_connection(&transport.id())?;
        Ok(Self::with_endpoint(endpoint, transport, vec![bootstrap]))
    }

    fn with_endpoint(endpoint: Endpoint, transport: T, outbox: Vec<Vec<u8>>) -> (Self, PeerHandle) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = watch::channel(endpoint.frame());
        let session = Self {
            endpoint,
            transport,
            controls: control_rx,
            frames: frame_tx,
            outbox,
        };
        let handle = PeerHandle {
            controls: control_tx,
            frames: frame_rx,
        };
        (session, handle)
    }

    pub fn role(&self) -> Option<Role> {
        self.endpoint.role()
    }

    /// Run until shutdown or until the peer goes away.
    ///
    /// Transport failures other than a closed peer end the session with an
    /// error. Nothing is retried.
    pub async fn run(self) -> Result<SessionReport, PeerError> {
        let Self {
            mut endpoint,
            mut transport,
            mut controls,
            frames,
            outbox,
        } = self;
        let id = transport.id();

        let period = Duration::from_secs_f64(1.0 / f64::from(endpoint.config().tick_rate_hz));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let exit = if send_all(&mut transport, outbox).await? {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let outbound = endpoint.step();
                        frames.send_replace(endpoint.frame());
                        if !send_all(&mut transport, outbound).await? {
                            break ExitReason::PeerClosed;
                        }
                    }
                    inbound = transport.recv() => match inbound? {
                        Some(payload) => {
                            endpoint.receive(&payload);
                        }
                        None => break ExitReason::PeerClosed,
                    },
                    control = controls.recv() => match control {
                        Some(Control::Input(command)) => {
                            endpoint.inject(command);
                        }
                        Some(Control::Shutdown) | None => break ExitReason::Shutdown,
                    },
                }
            }
        } else {
            ExitReason::PeerClosed
        };

        endpoint.close_connection(&id);
        let score = endpoint.score();
        log::info!(
            "session {id} ended after {} ticks ({exit:?}), score {}-{}",
            endpoint.tick(),
            score.player1,
            score.player2
        );

        Ok(SessionReport {
            ticks: endpoint.tick(),
            score,
            exit,
        })
    }
}

/// Send every payload in order. `Ok(false)` if the peer has closed.
async fn send_all<T: Transport>(
    transport: &mut T,
    payloads: Vec<Vec<u8>>,
) -> Result<bool, PeerError> {
    for payload in payloads {
        match transport.send(payload).await {
            Ok(()) => {}
            Err(TransportError::Closed) => return Ok(false),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use peerball_sim::{BodyStateStore, Label};

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick_is_clean() {
        let (a, _b) = ChannelTransport::pair();
        let (session, handle) = PeerSession::accept(PeerConfig::default(), a).unwrap();
        handle.shutdown();

        let report = session.run().await.unwrap();
        assert_eq!(report.exit, ExitReason::Shutdown);
        assert_eq!(report.score, Score::default());
        assert!(!handle.press(Command::Up));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_ends_session() {
        let (a, _b) = ChannelTransport::pair();
        let (session, handle) = PeerSession::accept(PeerConfig::default(), a).unwrap();
        drop(handle);

        let report = session.run().await.unwrap();
        assert_eq!(report.exit, ExitReason::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initiator_sends_bootstrap_first() {
        let (a, mut b) = ChannelTransport::pair();
        let (session, handle) = PeerSession::initiate(PeerConfig::default(), a).unwrap();
        assert_eq!(session.role(), Some(Role::Player2));
        let task = tokio::spawn(session.run());

        let first = b.recv().await.unwrap().unwrap();
        assert_eq!(
            peerball_wire::WireMessage::decode(&first).unwrap(),
            peerball_wire::WireMessage::Bootstrap(BodyStateStore::kickoff())
        );

        drop(b);
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.exit, ExitReason::PeerClosed);
        assert_eq!(handle.frame().role, Some(Role::Player2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_published_per_tick() {
        let (a, _b) = ChannelTransport::pair();
        let (session, handle) = PeerSession::accept(PeerConfig::default(), a).unwrap();
        let mut frames = handle.frames();
        let task = tokio::spawn(session.run());

        frames.changed().await.unwrap();
        let first = frames.borrow_and_update().tick;
        frames.changed().await.unwrap();
        let second = frames.borrow_and_update().tick;
        assert!(second > first);
        assert_eq!(handle.frame().bodies.get(Label::Ball), [400.0, 300.0]);

        handle.shutdown();
        let report = task.await.unwrap().unwrap();
        assert!(report.ticks >= second);
    }

    #[test]
    fn test_press_key_rejects_unknown_keys() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (_frame_tx, frame_rx) = watch::channel(Endpoint::new(PeerConfig::default()).frame());
        let handle = PeerHandle {
            controls: tx,
            frames: frame_rx,
        };
        assert!(handle.press_key("ArrowLeft"));
        assert!(!handle.press_key("Space"));
    }
}
