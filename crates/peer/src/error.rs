//! Errors surfaced to the caller of a session.
//!
//! Malformed inbound messages are not errors; they are absorbed as
//! [`DropReason`](crate::validation::DropReason).

use crate::session::{Role, SessionId};
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A connection in the opposite direction to an already assigned role.
    #[error("connection {id} requests {requested} but this endpoint is {assigned}")]
    RoleConflict {
        id: SessionId,
        assigned: Role,
        requested: Role,
    },
}
