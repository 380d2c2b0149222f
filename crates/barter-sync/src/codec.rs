//! Wire codec for partner envelopes
//!
//! A frame is one version byte followed by the bincode encoding of an
//! [`Envelope`].

use crate::error::{Error, Result};
use barter_core::Envelope;

/// Version byte written at the start of every frame
pub const PROTOCOL_VERSION: u8 = 1;

/// Encode an envelope into a frame
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
    let body = bincode::serialize(envelope)?;
    let mut frame = Vec::with_capacity(body.len() + 1);
    frame.push(PROTOCOL_VERSION);
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode a frame produced by [`encode`]
pub fn decode(frame: &[u8]) -> Result<Envelope> {
    let (&version, body) = frame.split_first().ok_or(Error::EmptyFrame)?;
    if version != PROTOCOL_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    Ok(bincode::deserialize(body)?)
}
