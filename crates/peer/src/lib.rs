//! Peerball Endpoint
//!
//! One side of a two-player match. Each endpoint runs its own physics world
//! and keeps it visually consistent with the peer's by exchanging body
//! positions over a single Transport Session. It owns:
//! - Role Assignment and the Connection Set
//! - The Local Simulation Driver and its input queue
//! - The State Synchronizer (change detection, inbound reconciliation)
//! - The Scoring Monitor
//! - The async event loop and its handle
//!
//! # Architecture
//!
//! [`Endpoint`] is synchronous and I/O-free: `step()` yields outbound
//! payloads, `receive()` consumes inbound ones. [`runtime::PeerSession`]
//! drives an endpoint from a tick interval, a [`transport::Transport`] and a
//! control channel, all on one task, so the store is never shared.

#![deny(unsafe_code)]

pub mod driver;
pub mod error;
pub mod input;
pub mod runtime;
pub mod session;
pub mod sync;
pub mod transport;
pub mod validation;

use peerball_sim::{BodyStateStore, Score, ScoringMonitor, Tick};
use peerball_wire::WireMessage;

use driver::LocalDriver;
pub use error::PeerError;
use input::Command;
use session::{ConnectionSet, Direction, Role, Session};
use sync::{SyncPolicy, Synchronizer};
use validation::{DropReason, Received, validate_inbound};

// ============================================================================
// Parameters
// ============================================================================

/// Simulation and broadcast cadence in Hz.
pub const TICK_RATE_HZ: u32 = 60;

/// Force applied per key press, in mass·units/s². Moves a resting player
/// roughly 140 units/s after one tick of damping.
pub const KEY_FORCE: f64 = 15_000.0;

/// How long a listening endpoint waits for its peer, in milliseconds.
pub const CONNECT_TIMEOUT_MS: u64 = 30000;

// ============================================================================
// Endpoint State
// ============================================================================

/// Endpoint configuration.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub tick_rate_hz: u32,
    pub key_force: f64,
    pub connect_timeout_ms: u64,
    pub policy: SyncPolicy,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            key_force: KEY_FORCE,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            policy: SyncPolicy::Symmetric,
        }
    }
}

/// What the rendering layer sees once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub tick: Tick,
    pub role: Option<Role>,
    pub bodies: BodyStateStore,
    pub score: Score,
}

pub struct Endpoint {
    config: PeerConfig,
    driver: LocalDriver,
    synchronizer: Synchronizer,
    monitor: ScoringMonitor,
    role: Option<Role>,
    connections: ConnectionSet,
}

impl Endpoint {
    pub fn new(config: PeerConfig) -> Self {
        Self {
            driver: LocalDriver::new(config.tick_rate_hz, config.key_force),
            synchronizer: Synchronizer::new(config.policy),
            monitor: ScoringMonitor::new(),
            role: None,
            connections: ConnectionSet::new(),
            config,
        }
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn tick(&self) -> Tick {
        self.driver.context().world().tick()
    }

    pub fn score(&self) -> Score {
        self.driver.context().score()
    }

    pub fn store(&self) -> &BodyStateStore {
        self.driver.context().store()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Record an inbound connection. Assigns player1 on first use.
    pub fn accept_connection(&mut self, id: &str) -> Result<Role, PeerError> {
        self.open(id, Direction::Accepted)
    }

    /// Record an outbound connection, assigning player2 on first use, and
    /// return the bootstrap snapshot to send first.
    pub fn open_connection(&mut self, id: &str) -> Result<Vec<u8>, PeerError> {
        self.open(id, Direction::Initiated)?;
        Ok(WireMessage::Bootstrap(*self.store()).encode())
    }

    /// Forget a connection. The role stays assigned.
    pub fn close_connection(&mut self, id: &str) -> bool {
        let closed = self.connections.close(id).is_some();
        if closed {
            log::info!("connection {id} closed");
        }
        closed
    }

    fn open(&mut self, id: &str, direction: Direction) -> Result<Role, PeerError> {
        let requested = Role::from_direction(direction);
        if let Some(assigned) = self.role
            && assigned != requested
        {
            return Err(PeerError::RoleConflict {
                id: id.to_string(),
                assigned,
                requested,
            });
        }

        if !self.connections.is_empty() {
            log::warn!(
                "opening connection {id} with {} already open",
                self.connections.len()
            );
        }
        if !self.connections.open(Session::new(id, direction)) {
            log::warn!("connection {id} is already open");
        }

        if self.role.is_none() {
            self.role = Some(requested);
            self.driver.assign(requested);
            self.synchronizer.assign(requested);
            log::info!("connection {id} opened, playing as {requested}");
        }
        Ok(requested)
    }

    /// Queue a movement command for the owned body. `false` before a role
    /// is assigned.
    pub fn inject(&mut self, command: Command) -> bool {
        self.driver.inject(command)
    }

    /// Advance one tick and return the payloads to broadcast.
    ///
    /// Order: step the world with queued input, diff body positions against
    /// the pre-step state, run the Scoring Monitor, then refresh the store.
    /// The diff sees the in-goal ball before any reset, and the reset itself
    /// is never diffed: the next tick starts from the post-reset positions.
    /// A goal announcement follows the updates of its tick. Without an open
    /// connection the simulation still runs and the payloads are discarded.
    pub fn step(&mut self) -> Vec<Vec<u8>> {
        let previous = self.driver.advance();
        let current = self.driver.context().world().body_state();
        let mut outbound: Vec<Vec<u8>> = self
            .synchronizer
            .collect_changes(&previous, &current)
            .into_iter()
            .map(|update| WireMessage::Update(update).encode())
            .collect();

        if self.synchronizer.detects_goals() {
            let (world, score) = self.driver.context_mut().world_and_score();
            if let Some(event) = self.monitor.observe(world, score) {
                log::info!(
                    "{} scored in {} ({}-{})",
                    event.scorer,
                    event.goal,
                    event.score.player1,
                    event.score.player2
                );
                if self.synchronizer.announces_goals() {
                    outbound.push(
                        WireMessage::GoalScored {
                            goal: event.goal,
                            score: event.score,
                        }
                        .encode(),
                    );
                }
            }
        }

        self.driver.context_mut().refresh_store();

        if self.connections.is_empty() {
            outbound.clear();
        }
        outbound
    }

    /// Validate and apply one inbound payload.
    pub fn receive(&mut self, bytes: &[u8]) -> Received {
        let message = match validate_inbound(bytes, self.role, self.synchronizer.policy()) {
            Ok(message) => message,
            Err(reason @ DropReason::UnexpectedBootstrap) => {
                log::warn!("dropped inbound message: {reason}");
                return Received::Dropped(reason);
            }
            Err(reason) => {
                log::debug!("dropped inbound message: {reason}");
                return Received::Dropped(reason);
            }
        };

        let context = self.driver.context_mut();
        match message {
            WireMessage::Update(update) => {
                self.synchronizer.apply(context, update);
                Received::Update(update.label)
            }
            WireMessage::Bootstrap(snapshot) => {
                self.synchronizer.apply_bootstrap(context, snapshot);
                log::info!("bootstrap applied");
                Received::Bootstrapped
            }
            WireMessage::GoalScored { goal, score } => {
                let (world, local) = context.world_and_score();
                local.merge(score);
                world.reset_kickoff();
                context.refresh_store();
                log::info!(
                    "peer reports goal in {goal} ({}-{})",
                    score.player1,
                    score.player2
                );
                Received::Goal(goal)
            }
        }
    }

    pub fn frame(&self) -> Frame {
        Frame {
            tick: self.tick(),
            role: self.role,
            bodies: *self.store(),
            score: self.score(),
        }
    }

    #[cfg(test)]
    fn world_mut(&mut self) -> &mut peerball_sim::World {
        self.driver.context_mut().world_mut()
    }
}

// ============================================================================
// Tests
// ============================================================================
