//! Error types for barter-sync

use barter_core::PartyId;
use thiserror::Error;

/// Sync error type
#[derive(Debug, Error)]
pub enum Error {
    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Frame shorter than its header
    #[error("Empty frame")]
    EmptyFrame,

    /// Frame written by an incompatible peer
    #[error("Unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// No link to this party
    #[error("No connection to {0}")]
    UnknownPeer(PartyId),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, Error>;
