//! Inbound message validation.
//!
//! Every inbound payload is decoded and checked against the local role and
//! sync policy before it may touch the store. Failures are not errors: the
//! message is dropped with a [`DropReason`], logged at debug, and the
//! session carries on.
//!
//! - Undecodable payload or unknown label/goal: DROP
//! - Update for a body this endpoint owns (host authority only): DROP
//! - Bootstrap received by the initiating side: DROP
//! - GoalScored outside host authority, or received by the host: DROP
//! - Anything before a role is assigned: DROP

use peerball_sim::{Goal, Label};
use peerball_wire::{WireError, WireMessage};

use crate::session::Role;
use crate::sync::SyncPolicy;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DropReason {
    #[error("malformed message: {0}")]
    Malformed(#[from] WireError),

    #[error("update for locally owned body {0}")]
    OwnedBody(Label),

    #[error("bootstrap received by the initiating side")]
    UnexpectedBootstrap,

    #[error("goal announcement not expected by this endpoint")]
    UnexpectedGoal,

    #[error("no role assigned yet")]
    NotConnected,
}

/// Outcome of handling one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    /// A body position was written to the store and the world.
    Update(Label),
    /// The full body state was replaced.
    Bootstrapped,
    /// The carried score was merged and the field reset.
    Goal(Goal),
    Dropped(DropReason),
}

/// Decode `bytes` and check the message is acceptable for `role` under
/// `policy`.
pub fn validate_inbound(
    bytes: &[u8],
    role: Option<Role>,
    policy: SyncPolicy,
) -> Result<WireMessage, DropReason> {
    let Some(role) = role else {
        return Err(DropReason::NotConnected);
    };

    let message = WireMessage::decode(bytes)?;

    match &message {
        WireMessage::Update(update) => {
            if policy.owner(update.label) == Some(role) {
                return Err(DropReason::OwnedBody(update.label));
            }
        }
        WireMessage::Bootstrap(_) => {
            if !role.is_host() {
                return Err(DropReason::UnexpectedBootstrap);
            }
        }
        WireMessage::GoalScored { .. } => {
            if policy != SyncPolicy::HostAuthoritative || role.is_host() {
                return Err(DropReason::UnexpectedGoal);
            }
        }
    }

    Ok(message)
}
