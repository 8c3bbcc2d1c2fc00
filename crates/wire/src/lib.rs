//! Peerball Wire Protocol Types
//!
//! This crate defines the Protobuf messages exchanged between the two
//! endpoints of a match, and the validated conversions between those
//! messages and simulation types. Both endpoints MUST depend on this crate.
//!
//! # Message Kinds
//!
//! Every datagram is a single [`PeerMessage`] whose `kind` oneof carries one of:
//! - **BodyUpdate**: one body's new position, sent on significant movement
//! - **BootstrapSnapshot**: full body state, sent once by the connecting side
//! - **GoalScored**: score after a goal, sent by the host under host authority
//!
//! Inbound messages are validated into [`WireMessage`]. Labels and goal names
//! outside the known set fail closed with a [`WireError`].

#![deny(unsafe_code)]

use peerball_sim::{BodyStateStore, BodyUpdate, Goal, Label, NameError, Score, Vec2};
use prost::Message;

/// Decimal digits carried by every transmitted coordinate.
pub const POSITION_DECIMALS: i32 = 5;

/// Round a coordinate to `POSITION_DECIMALS` digits.
pub fn round_position(value: f64) -> f64 {
    let factor = 10f64.powi(POSITION_DECIMALS);
    (value * factor).round() / factor
}

// ============================================================================
// Errors
// ============================================================================

/// Reasons an inbound datagram is not a valid message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    #[error("failed to decode message: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("message carries no payload")]
    Empty,

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("`{field}` missing from {message}")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    #[error("non-finite coordinate for {label}")]
    NonFinite { label: Label },

    #[error("bootstrap players must be exactly player1 and player2")]
    SnapshotPlayers,

    #[error("bootstrap ball entry is labelled `{0}`")]
    SnapshotBall(Label),
}

// ============================================================================
// Protobuf Messages
// ============================================================================

/// One body's position.
#[derive(Clone, PartialEq, Message)]
pub struct BodyUpdateProto {
    /// "player1" | "player2" | "ball".
    #[prost(string, tag = "1")]
    pub label: String,

    #[prost(double, optional, tag = "2")]
    pub x: Option<f64>,

    #[prost(double, optional, tag = "3")]
    pub y: Option<f64>,
}

/// Full body state, sent once by the connecting side when the channel opens.
#[derive(Clone, PartialEq, Message)]
pub struct BootstrapSnapshot {
    /// Exactly player1 and player2, in any order.
    #[prost(message, repeated, tag = "1")]
    pub players: Vec<BodyUpdateProto>,

    #[prost(message, optional, tag = "2")]
    pub ball: Option<BodyUpdateProto>,
}

/// Goal announcement from the scoring authority.
#[derive(Clone, PartialEq, Message)]
pub struct GoalScored {
    /// "goal1" | "goal2".
    #[prost(string, tag = "1")]
    pub goal: String,

    /// Score after the goal.
    #[prost(uint32, tag = "2")]
    pub player1: u32,

    #[prost(uint32, tag = "3")]
    pub player2: u32,
}

/// Top-level datagram.
#[derive(Clone, PartialEq, Message)]
pub struct PeerMessage {
    #[prost(oneof = "peer_message::Kind", tags = "1, 2, 3")]
    pub kind: Option<peer_message::Kind>,
}

pub mod peer_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Update(super::BodyUpdateProto),

        #[prost(message, tag = "2")]
        Bootstrap(super::BootstrapSnapshot),

        #[prost(message, tag = "3")]
        Goal(super::GoalScored),
    }
}

// ============================================================================
// Validated Messages
// ============================================================================

/// A decoded and validated inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Update(BodyUpdate),
    Bootstrap(BodyStateStore),
    GoalScored { goal: Goal, score: Score },
}

impl WireMessage {
    pub fn encode(&self) -> Vec<u8> {
        PeerMessage::from(self.clone()).encode_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let message = PeerMessage::decode(bytes)?;
        message.try_into()
    }
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<BodyUpdate> for BodyUpdateProto {
    fn from(update: BodyUpdate) -> Self {
        Self {
            label: update.label.as_str().to_string(),
            x: Some(round_position(update.position[0])),
            y: Some(round_position(update.position[1])),
        }
    }
}

impl TryFrom<BodyUpdateProto> for BodyUpdate {
    type Error = WireError;

    fn try_from(proto: BodyUpdateProto) -> Result<Self, Self::Error> {
        let label: Label = proto.label.parse()?;
        let x = proto.x.ok_or(WireError::MissingField {
            message: "BodyUpdate",
            field: "x",
        })?;
        let y = proto.y.ok_or(WireError::MissingField {
            message: "BodyUpdate",
            field: "y",
        })?;
        if !x.is_finite() || !y.is_finite() {
            return Err(WireError::NonFinite { label });
        }
        let position: Vec2 = [x, y];
        Ok(BodyUpdate::new(label, position))
    }
}

impl From<BodyStateStore> for BootstrapSnapshot {
    fn from(store: BodyStateStore) -> Self {
        Self {
            players: [Label::Player1, Label::Player2]
                .into_iter()
                .map(|label| BodyUpdate::new(label, store.get(label)).into())
                .collect(),
            ball: Some(BodyUpdate::new(Label::Ball, store.get(Label::Ball)).into()),
        }
    }
}

impl TryFrom<BootstrapSnapshot> for BodyStateStore {
    type Error = WireError;

    /// All-or-nothing: a snapshot that fails any check yields no store.
    fn try_from(snapshot: BootstrapSnapshot) -> Result<Self, Self::Error> {
        let mut player1 = None;
        let mut player2 = None;
        for proto in snapshot.players {
            let update = BodyUpdate::try_from(proto)?;
            let slot = match update.label {
                Label::Player1 => &mut player1,
                Label::Player2 => &mut player2,
                Label::Ball => return Err(WireError::SnapshotPlayers),
            };
            if slot.replace(update.position).is_some() {
                return Err(WireError::SnapshotPlayers);
            }
        }
        let (Some(player1), Some(player2)) = (player1, player2) else {
            return Err(WireError::SnapshotPlayers);
        };

        let ball = snapshot.ball.ok_or(WireError::MissingField {
            message: "BootstrapSnapshot",
            field: "ball",
        })?;
        let ball = BodyUpdate::try_from(ball)?;
        if ball.label != Label::Ball {
            return Err(WireError::SnapshotBall(ball.label));
        }

        Ok(BodyStateStore::from_positions(player1, player2, ball.position))
    }
}

impl From<WireMessage> for PeerMessage {
    fn from(message: WireMessage) -> Self {
        let kind = match message {
            WireMessage::Update(update) => peer_message::Kind::Update(update.into()),
            WireMessage::Bootstrap(store) => peer_message::Kind::Bootstrap(store.into()),
            WireMessage::GoalScored { goal, score } => peer_message::Kind::Goal(GoalScored {
                goal: goal.as_str().to_string(),
                player1: score.player1,
                player2: score.player2,
            }),
        };
        Self { kind: Some(kind) }
    }
}

impl TryFrom<PeerMessage> for WireMessage {
    type Error = WireError;

    fn try_from(message: PeerMessage) -> Result<Self, Self::Error> {
        match message.kind.ok_or(WireError::Empty)? {
            peer_message::Kind::Update(proto) => Ok(Self::Update(proto.try_into()?)),
            peer_message::Kind::Bootstrap(proto) => Ok(Self::Bootstrap(proto.try_into()?)),
            peer_message::Kind::Goal(proto) => Ok(Self::GoalScored {
                goal: proto.goal.parse()?,
                score: Score {
                    player1: proto.player1,
                    player2: proto.player2,
                },
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
