//! Transport Sessions.
//!
//! A [`Transport`] is an ordered, bidirectional channel of whole message
//! payloads between two endpoints. Two implementations are provided:
//!
//! - [`ChannelTransport`]: an in-memory pair over tokio mpsc, for tests and
//!   same-process matches.
//! - [`UdpTransport`]: one datagram per message over a connected
//!   `tokio::net::UdpSocket`. UDP has no close handshake; the only signal
//!   is a refused connection once the peer's port is gone, which surfaces
//!   as [`TransportError::Closed`] from `send` and `None` from `recv`.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::session::SessionId;

/// Largest payload a single datagram can carry.
pub const MAX_DATAGRAM: usize = 65_535;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport i/o: {0}")]
    Io(#[from] io::Error),

    #[error("transport closed by peer")]
    Closed,

    #[error("no peer connected within {0:?}")]
    Timeout(Duration),
}

/// Message channel to the remote endpoint.
pub trait Transport: Send {
    /// Connection identifier.
    fn id(&self) -> SessionId;

    /// Send one message. Fails with [`TransportError::Closed`] once the peer
    /// is gone.
    fn send(&mut self, payload: Vec<u8>) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next inbound message, or `None` once the peer has closed the session.
    /// Cancel safe.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;
}

// ============================================================================
// In-memory
// ============================================================================

static NEXT_CHANNEL: AtomicU64 = AtomicU64::new(1);

/// One end of an in-memory transport pair. Dropping it closes the session
/// for the other end.
#[derive(Debug)]
pub struct ChannelTransport {
    id: SessionId,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl ChannelTransport {
    /// Two connected ends, named `channel-N-a` and `channel-N-b`.
    pub fn pair() -> (Self, Self) {
        let n = NEXT_CHANNEL.fetch_add(1, Ordering::Relaxed);
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let a = Self {
            id: format!("channel-{n}-a"),
            tx: a_tx,
            rx: a_rx,
        };
        let b = Self {
            id: format!("channel-{n}-b"),
            tx: b_tx,
            rx: b_rx,
        };
        (a, b)
    }
}

impl Transport for ChannelTransport {
    fn id(&self) -> SessionId {
        self.id.clone()
    }

    async fn send(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.tx.send(payload).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

// ============================================================================
// UDP
// ============================================================================

/// A UDP socket connected to a single peer.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    /// Datagram consumed while accepting, handed out by the first `recv`.
    pending: Option<Vec<u8>>,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Bind `bind` and wait for a peer. See [`UdpTransport::accept`].
    pub async fn listen(bind: SocketAddr, timeout: Duration) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(bind).await?;
        Self::accept(socket, timeout).await
    }

    /// Wait up to `timeout` for the first datagram and connect to its sender.
    ///
    /// The first datagram is the peer's bootstrap, so it is kept and returned
    /// by the first `recv`.
    pub async fn accept(socket: UdpSocket, timeout: Duration) -> Result<Self, TransportError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, peer) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;
        socket.connect(peer).await?;
        log::debug!("udp peer {peer} connected");
        Ok(Self {
            socket,
            peer,
            pending: Some(buf[..n].to_vec()),
            buf,
        })
    }

    /// Bind `bind` and connect to `peer`. Nothing is sent until the session
    /// produces its first message.
    pub async fn connect(bind: SocketAddr, peer: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(peer).await?;
        Ok(Self {
            socket,
            peer,
            pending: None,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpTransport {
    fn id(&self) -> SessionId {
        self.peer.to_string()
    }

    async fn send(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        match self.socket.send(&payload).await {
            Ok(_) => Ok(()),
            Err(err) if peer_gone(&err) => Err(TransportError::Closed),
            Err(err) => Err(err.into()),
        }
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(first) = self.pending.take() {
            return Ok(Some(first));
        }
        match self.socket.recv(&mut self.buf).await {
            Ok(n) => Ok(Some(self.buf[..n].to_vec())),
            Err(err) if peer_gone(&err) => {
                log::debug!("udp peer {} refused: {err}", self.peer);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// An ICMP port unreachable on a connected socket: nothing listens on the
/// peer's address any more.
fn peer_gone(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::ConnectionRefused
}
