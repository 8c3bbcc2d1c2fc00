//! Local Simulation Driver.
//!
//! Owns the per-session [`MatchContext`] and steps it once per tick,
//! applying queued input forces to the locally owned body only. Other bodies
//! move through collision response, inbound updates or a field reset.

use peerball_sim::{BodyStateStore, Label, Score, World};

use crate::input::{Command, InputQueue};
use crate::session::Role;

/// Everything one endpoint knows about the match.
#[derive(Debug, Clone)]
pub struct MatchContext {
    world: World,
    store: BodyStateStore,
    score: Score,
}

impl MatchContext {
    /// Fresh match at kickoff.
    pub fn new(tick_rate_hz: u32) -> Self {
        let world = World::new(tick_rate_hz);
        Self {
            store: world.body_state(),
            world,
            score: Score::default(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn store(&self) -> &BodyStateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BodyStateStore {
        &mut self.store
    }

    pub fn score(&self) -> Score {
        self.score
    }

    /// The world and the score together, as the Scoring Monitor needs them.
    pub fn world_and_score(&mut self) -> (&mut World, &mut Score) {
        (&mut self.world, &mut self.score)
    }

    /// Copy the world's body positions into the store.
    pub fn refresh_store(&mut self) {
        self.store = self.world.body_state();
    }
}

#[derive(Debug, Clone)]
pub struct LocalDriver {
    context: MatchContext,
    input: InputQueue,
    owned: Option<Label>,
    key_force: f64,
}

impl LocalDriver {
    pub fn new(tick_rate_hz: u32, key_force: f64) -> Self {
        Self {
            context: MatchContext::new(tick_rate_hz),
            input: InputQueue::new(),
            owned: None,
            key_force,
        }
    }

    pub fn assign(&mut self, role: Role) {
        self.owned = Some(role.label());
    }

    /// Queue a command for the next step. Before a role is assigned the
    /// command is discarded and `false` returned.
    pub fn inject(&mut self, command: Command) -> bool {
        if self.owned.is_none() {
            log::debug!("input {command:?} before role assignment ignored");
            return false;
        }
        self.input.push(command);
        true
    }

    /// Step the world once with the queued forces. Returns body positions as
    /// they were before the step.
    pub fn advance(&mut self) -> BodyStateStore {
        let previous = self.context.world.body_state();
        let forces = match self.owned {
            Some(label) => self.input.drain_forces(label, self.key_force),
            None => Vec::new(),
        };
        let tick = self.context.world.tick();
        self.context.world.advance(tick, &forces);
        previous
    }

    pub fn context(&self) -> &MatchContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut MatchContext {
        &mut self.context
    }
}
