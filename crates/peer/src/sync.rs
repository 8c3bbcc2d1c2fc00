//! State Synchronizer.
//!
//! Decides which body positions go out after a tick and writes inbound
//! positions into the match context.
//!
//! Change detection compares positions at [`CHANGE_DECIMALS`] digits, while
//! transmitted values carry the wire's five digits. A body whose rounded x
//! or y moved by at least one tenth of a unit since the previous tick is
//! broadcast; jitter below that is not.

use peerball_sim::{BodyStateStore, BodyUpdate, Label};
use peerball_wire::round_position;

use crate::driver::MatchContext;
use crate::session::Role;

/// Decimal digits compared when deciding whether a body moved.
pub const CHANGE_DECIMALS: i32 = 1;

/// Who is responsible for which body, and for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Both endpoints broadcast every changed body, apply every inbound
    /// update and detect goals on their own. No score crosses the link.
    #[default]
    Symmetric,
    /// The host (player1) owns its player and the ball and is the only
    /// scorer; the guest owns player2 and follows the host's goal events.
    HostAuthoritative,
}

impl SyncPolicy {
    /// The role that exclusively owns `label`, if any.
    pub fn owner(self, label: Label) -> Option<Role> {
        match self {
            Self::Symmetric => None,
            Self::HostAuthoritative => match label {
                Label::Player2 => Some(Role::Player2),
                Label::Player1 | Label::Ball => Some(Role::Player1),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Synchronizer {
    policy: SyncPolicy,
    role: Option<Role>,
}

impl Synchronizer {
    pub fn new(policy: SyncPolicy) -> Self {
        Self { policy, role: None }
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    pub fn assign(&mut self, role: Role) {
        self.role = Some(role);
    }

    /// Whether this endpoint broadcasts changes to `label`.
    pub fn broadcasts(&self, label: Label) -> bool {
        match self.policy.owner(label) {
            None => true,
            owner => owner == self.role,
        }
    }

    /// Whether this endpoint runs its own Scoring Monitor.
    pub fn detects_goals(&self) -> bool {
        match self.policy {
            SyncPolicy::Symmetric => true,
            SyncPolicy::HostAuthoritative => self.role != Some(Role::Player2),
        }
    }

    /// Whether a goal detected here is announced to the peer.
    pub fn announces_goals(&self) -> bool {
        self.policy == SyncPolicy::HostAuthoritative && self.role == Some(Role::Player1)
    }

    /// Bodies whose position changed between `previous` and `current`,
    /// limited to the ones this endpoint broadcasts.
    pub fn collect_changes(
        &self,
        previous: &BodyStateStore,
        current: &BodyStateStore,
    ) -> Vec<BodyUpdate> {
        current
            .iter()
            .filter(|update| self.broadcasts(update.label))
            .filter(|update| moved(previous.get(update.label), update.position))
            .collect()
    }

    /// Last-writer-wins: the update overwrites both the store and the body
    /// in the local world. Velocity is kept.
    pub fn apply(&self, context: &mut MatchContext, update: BodyUpdate) {
        context.store_mut().apply(update);
        context.world_mut().set_position(update.label, update.position);
    }

    /// Replace every position with the snapshot's.
    pub fn apply_bootstrap(&self, context: &mut MatchContext, snapshot: BodyStateStore) {
        for update in snapshot.iter() {
            self.apply(context, update);
        }
    }
}

fn moved(before: [f64; 2], after: [f64; 2]) -> bool {
    quantize(before[0]) != quantize(after[0]) || quantize(before[1]) != quantize(after[1])
}

fn quantize(value: f64) -> i64 {
    let factor = 10f64.powi(CHANGE_DECIMALS);
    (round_position(value) * factor).round() as i64
}
