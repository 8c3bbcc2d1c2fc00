//! Scoring Monitor.
//!
//! Observes ball/goal overlap in the local world after every step. An overlap
//! episode credits the scorer exactly once and resets the field; further
//! overlaps are ignored until a step observes the ball clear of both goals.

use crate::{Goal, Label, World};

/// Goals per player. Monotonically non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    pub player1: u32,
    pub player2: u32,
}

impl Score {
    pub fn get(&self, player: Label) -> u32 {
        match player {
            Label::Player1 => self.player1,
            Label::Player2 => self.player2,
            Label::Ball => 0,
        }
    }

    /// Add one goal for `scorer`. The ball cannot score.
    pub fn credit(&mut self, scorer: Label) {
        match scorer {
            Label::Player1 => self.player1 += 1,
            Label::Player2 => self.player2 += 1,
            Label::Ball => {}
        }
    }

    /// Field-wise maximum, so merging never lowers a score.
    pub fn merge(&mut self, other: Score) {
        self.player1 = self.player1.max(other.player1);
        self.player2 = self.player2.max(other.player2);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Playing,
    /// A goal was scored and the field reset; waiting for the ball to be
    /// observed clear of every goal.
    Resetting { goal: Goal },
}

/// Emitted once per scoring episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalEvent {
    pub goal: Goal,
    pub scorer: Label,
    /// Score after crediting this goal.
    pub score: Score,
}

#[derive(Debug, Clone)]
pub struct ScoringMonitor {
    state: MonitorState,
}

impl ScoringMonitor {
    pub fn new() -> Self {
        Self {
            state: MonitorState::Playing,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Check the ball against both goals.
    ///
    /// On the first overlapping step of an episode: credit the scorer, reset
    /// the world to kickoff and return the event.
    pub fn observe(&mut self, world: &mut World, score: &mut Score) -> Option<GoalEvent> {
        let overlapping = Goal::ALL.into_iter().find(|&goal| world.ball_overlaps(goal));

        match (self.state, overlapping) {
            (MonitorState::Playing, Some(goal)) => {
                let scorer = goal.scorer();
                score.credit(scorer);
                world.reset_kickoff();
                self.state = MonitorState::Resetting { goal };
                Some(GoalEvent {
                    goal,
                    scorer,
                    score: *score,
                })
            }
            (MonitorState::Resetting { .. }, None) => {
                self.state = MonitorState::Playing;
                None
            }
            _ => None,
        }
    }
}

impl Default for ScoringMonitor {
    fn default() -> Self {
        Self::new()
    }
}
