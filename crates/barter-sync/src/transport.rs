//! Transport traits for partner communication
//!
//! Users implement [`Connection`] for their network stack (TCP, WebSocket,
//! a game server relay...). Trade traffic needs reliable, ordered
//! delivery, so there is no unreliable send.

use barter_core::PartyId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Connection to one remote party
pub trait Connection: Send + Sync {
    /// Error type for this connection
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send a frame (guaranteed delivery, ordered)
    fn send(&self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Receive a frame (non-blocking)
    ///
    /// Returns `Ok(None)` if no frame is available.
    fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Check if the connection is still alive
    fn is_connected(&self) -> bool;

    /// The party on the other end
    fn remote_party(&self) -> &PartyId;

    /// Close the connection gracefully
    fn close(&self) -> Result<(), Self::Error>;
}

/// Error from a [`LoopbackConnection`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoopbackError {
    #[error("connection closed")]
    Closed,
    #[error("loopback state poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
struct Link {
    /// Frames travelling from side A to side B, and back
    a_to_b: VecDeque<Vec<u8>>,
    b_to_a: VecDeque<Vec<u8>>,
    open: bool,
}

/// In-process connection pair, for tests and local play
#[derive(Debug, Clone)]
pub struct LoopbackConnection {
    link: Arc<Mutex<Link>>,
    remote: PartyId,
    side_a: bool,
}

impl LoopbackConnection {
    /// Create both ends of a link between `a` and `b`
    ///
    /// The first connection is held by `a` and talks to `b`.
    pub fn pair(a: impl Into<PartyId>, b: impl Into<PartyId>) -> (Self, Self) {
        let link = Arc::new(Mutex::new(Link {
            open: true,
            ..Link::default()
        }));
        let a_end = Self {
            link: link.clone(),
            remote: b.into(),
            side_a: true,
        };
        let b_end = Self {
            link,
            remote: a.into(),
            side_a: false,
        };
        (a_end, b_end)
    }

    /// Frames sent to us that have not been received yet
    pub fn pending(&self) -> usize {
        self.link
            .lock()
            .map(|link| {
                if self.side_a {
                    link.b_to_a.len()
                } else {
                    link.a_to_b.len()
                }
            })
            .unwrap_or(0)
    }
}

impl Connection for LoopbackConnection {
    type Error = LoopbackError;

    fn send(&self, frame: &[u8]) -> Result<(), Self::Error> {
        let mut link = self.link.lock().map_err(|_| LoopbackError::Poisoned)?;
        if !link.open {
            return Err(LoopbackError::Closed);
        }
        let queue = if self.side_a {
            &mut link.a_to_b
        } else {
            &mut link.b_to_a
        };
        queue.push_back(frame.to_vec());
        Ok(())
    }

    fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut link = self.link.lock().map_err(|_| LoopbackError::Poisoned)?;
        let queue = if self.side_a {
            &mut link.b_to_a
        } else {
            &mut link.a_to_b
        };
        // Frames already in flight are still delivered after close
        Ok(queue.pop_front())
    }

    fn is_connected(&self) -> bool {
        self.link.lock().map(|link| link.open).unwrap_or(false)
    }

    fn remote_party(&self) -> &PartyId {
        &self.remote
    }

    fn close(&self) -> Result<(), Self::Error> {
        let mut link = self.link.lock().map_err(|_| LoopbackError::Poisoned)?;
        link.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_both_directions() {
        let (alice, bob) = LoopbackConnection::pair("alice", "bob");
        assert_eq!(alice.remote_party(), &PartyId::new("bob"));
        assert_eq!(bob.remote_party(), &PartyId::new("alice"));

        alice.send(b"hello").unwrap();
        alice.send(b"again").unwrap();
        bob.send(b"hi").unwrap();

        assert_eq!(bob.pending(), 2);
        assert_eq!(bob.recv().unwrap(), Some(b"hello".to_vec()));
        assert_eq!(bob.recv().unwrap(), Some(b"again".to_vec()));
        assert_eq!(bob.recv().unwrap(), None);
        assert_eq!(alice.recv().unwrap(), Some(b"hi".to_vec()));
    }

    #[test]
    fn test_loopback_close() {
        let (alice, bob) = LoopbackConnection::pair("alice", "bob");
        alice.send(b"last").unwrap();
        bob.close().unwrap();

        assert!(!alice.is_connected());
        assert_eq!(alice.send(b"more"), Err(LoopbackError::Closed));
        assert_eq!(bob.recv().unwrap(), Some(b"last".to_vec()));
    }
}
