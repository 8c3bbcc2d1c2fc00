//! Body State Store.
//!
//! The per-endpoint record of where each body is. Storage is a fixed array
//! indexed by [`Label`], so a store can be stale but never missing a body.

use crate::{Label, Vec2};

/// One body's new position, as produced by change detection or received
/// from the peer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyUpdate {
    pub label: Label,
    pub position: Vec2,
}

impl BodyUpdate {
    pub fn new(label: Label, position: Vec2) -> Self {
        Self { label, position }
    }
}

/// Mapping from label to position, with exactly one entry per label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyStateStore {
    /// Indexed by `Label::index()`.
    positions: [Vec2; 3],
}

impl BodyStateStore {
    /// Store holding the canonical kickoff positions.
    pub fn kickoff() -> Self {
        Self {
            positions: Label::ALL.map(Label::kickoff),
        }
    }

    pub fn from_positions(player1: Vec2, player2: Vec2, ball: Vec2) -> Self {
        Self {
            positions: [player1, player2, ball],
        }
    }

    pub fn get(&self, label: Label) -> Vec2 {
        self.positions[label.index()]
    }

    /// Last-writer-wins: the update replaces whatever was stored.
    pub fn apply(&mut self, update: BodyUpdate) {
        self.positions[update.label.index()] = update.position;
    }

    /// Every entry, in `Label::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = BodyUpdate> + '_ {
        Label::ALL
            .into_iter()
            .map(|label| BodyUpdate::new(label, self.get(label)))
    }
}

impl Default for BodyStateStore {
    fn default() -> Self {
        Self::kickoff()
    }
}
