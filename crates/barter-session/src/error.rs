//! Error types for barter-session
//!
//! Local precondition failures (duplicate add, removing an absent item,
//! confirming without a session) are reported as `false` and never reach
//! this type. [`ProtocolError`] covers inbound events that cannot be
//! applied; the controller logs and drops them.

use crate::TradeStatus;
use barter_core::{ItemId, PartyId};
use thiserror::Error;

/// Result type for applying inbound events
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// An inbound event that was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Offer event with no session to apply it to
    #[error("no active trade session")]
    NoActiveSession,

    /// Event from someone other than the active partner
    #[error("event from {got} but active partner is {expected}")]
    PartnerMismatch { expected: PartyId, got: PartyId },

    /// Event not valid in the current state
    #[error("{event} not allowed while {status}")]
    NotAllowed {
        event: &'static str,
        status: TradeStatus,
    },

    /// Partner offered an item its inventory does not hold
    #[error("partner item {0} cannot be resolved")]
    UnresolvedItem(ItemId),

    /// Partner's description of an item disagrees with its inventory
    #[error("partner item {0} does not match inventory")]
    ItemMismatch(ItemId),

    /// Partner offered the same item twice
    #[error("partner item {0} already offered")]
    DuplicateItem(ItemId),

    /// Partner removed an item it never offered
    #[error("partner item {0} is not in the offer")]
    ItemNotOffered(ItemId),

    /// Trade request from a party that already has one queued
    #[error("trade request from {0} already queued")]
    DuplicateRequest(PartyId),

    /// Too many queued trade requests
    #[error("request queue full, dropping request from {0}")]
    QueueFull(PartyId),

    /// Withdrawal of a request that is not queued
    #[error("no queued trade request from {0}")]
    NoSuchRequest(PartyId),

    /// Event claiming to come from the local party
    #[error("event claims to come from the local party {0}")]
    FromSelf(PartyId),

    /// Partner offered an item type the catalog does not know
    #[error("catalog: {0}")]
    Catalog(#[from] barter_core::Error),
}

// Compile-time check that ProtocolError can cross threads if an embedder
// moves it into a log sink.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<ProtocolError>();
}
