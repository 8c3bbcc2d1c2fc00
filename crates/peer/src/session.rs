//! Role Assignment and the Connection Set.
//!
//! Roles follow connection direction: the endpoint that accepts an inbound
//! connection plays player1 (the host), the endpoint that initiates plays
//! player2. No handshake carries the role; both sides apply the convention.

use std::fmt;

use peerball_sim::Label;

/// Connection identifier, as reported by the transport.
pub type SessionId = String;

/// Which side opened the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The peer connected to us.
    Accepted,
    /// We connected to the peer.
    Initiated,
}

/// The player an endpoint controls for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Player1,
    Player2,
}

impl Role {
    pub fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::Accepted => Self::Player1,
            Direction::Initiated => Self::Player2,
        }
    }

    /// The body this role may apply input forces to.
    pub fn label(self) -> Label {
        match self {
            Self::Player1 => Label::Player1,
            Self::Player2 => Label::Player2,
        }
    }

    /// The accepting side hosts the match.
    pub fn is_host(self) -> bool {
        self == Self::Player1
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().as_str())
    }
}

/// An open Transport Session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub direction: Direction,
}

impl Session {
    pub fn new(id: impl Into<SessionId>, direction: Direction) -> Self {
        Self {
            id: id.into(),
            direction,
        }
    }
}

/// Currently open sessions. Holds at most one in a two-player match, but
/// more are not structurally forbidden.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSet {
    sessions: Vec<Session>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. Returns false if the id is already open.
    pub fn open(&mut self, session: Session) -> bool {
        if self.contains(&session.id) {
            return false;
        }
        self.sessions.push(session);
        true
    }

    pub fn close(&mut self, id: &str) -> Option<Session> {
        let index = self.sessions.iter().position(|s| s.id == id)?;
        Some(self.sessions.remove(index))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_follows_direction() {
        assert_eq!(Role::from_direction(Direction::Accepted), Role::Player1);
        assert_eq!(Role::from_direction(Direction::Initiated), Role::Player2);
    }

    #[test]
    fn test_opposite_directions_never_share_a_role() {
        assert_ne!(
            Role::from_direction(Direction::Accepted),
            Role::from_direction(Direction::Initiated)
        );
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::Player1.label(), Label::Player1);
        assert_eq!(Role::Player2.label(), Label::Player2);
        assert_eq!(Role::Player2.to_string(), "player2");
        assert!(Role::Player1.is_host());
        assert!(!Role::Player2.is_host());
    }

    #[test]
    fn test_connection_set_open_close() {
        let mut connections = ConnectionSet::new();
        assert!(connections.is_empty());

        assert!(connections.open(Session::new("peer-a", Direction::Accepted)));
        assert!(!connections.open(Session::new("peer-a", Direction::Accepted)));
        assert_eq!(connections.len(), 1);

        let closed = connections.close("peer-a").unwrap();
        assert_eq!(closed.direction, Direction::Accepted);
        assert!(connections.is_empty());
        assert!(connections.close("peer-a").is_none());
    }

    #[test]
    fn test_connection_set_allows_more_than_one() {
        let mut connections = ConnectionSet::new();
        connections.open(Session::new("a", Direction::Accepted));
        connections.open(Session::new("b", Direction::Accepted));
        let ids: Vec<&str> = connections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
