//! Messages exchanged between trading parties
//!
//! The same [`PartnerEvent`] vocabulary is used in both directions: what
//! one client sends as [`Outbound`] arrives at the other wrapped in an
//! [`Envelope`].

use crate::item::ItemRef;
use crate::{ItemId, PartyId};
use serde::{Deserialize, Serialize};

/// The kind of event a party reports about its side of a trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartnerEvent {
    /// A trade invitation
    TradeRequestReceived { from_name: String },
    /// A previously sent invitation was taken back
    TradeRequestWithdrawn,
    /// The invited party accepted
    RequestAccepted { name: String },
    /// The invited party declined
    RequestDeclined,
    /// An item was put into the sender's offer
    ItemAdded { item: ItemRef },
    /// An item was taken out of the sender's offer
    ItemRemoved { id: ItemId },
    /// The sender confirmed its offer
    Confirmed,
    /// The sender withdrew its confirmation
    Unconfirmed,
    /// The sender cancelled the trade
    Cancelled,
}

impl PartnerEvent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            PartnerEvent::TradeRequestReceived { .. } => "trade-request-received",
            PartnerEvent::TradeRequestWithdrawn => "trade-request-withdrawn",
            PartnerEvent::RequestAccepted { .. } => "request-accepted",
            PartnerEvent::RequestDeclined => "request-declined",
            PartnerEvent::ItemAdded { .. } => "partner-item-added",
            PartnerEvent::ItemRemoved { .. } => "partner-item-removed",
            PartnerEvent::Confirmed => "partner-confirmed",
            PartnerEvent::Unconfirmed => "partner-unconfirmed",
            PartnerEvent::Cancelled => "partner-cancelled",
        }
    }
}

/// An inbound event with its sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: PartyId,
    /// Sender-side sequence number
    pub seq: u64,
    pub event: PartnerEvent,
}

impl Envelope {
    pub fn new(from: impl Into<PartyId>, event: PartnerEvent) -> Self {
        Self {
            from: from.into(),
            seq: 0,
            event,
        }
    }

    /// Set the sequence number
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }
}

/// An event the local party wants delivered to another party
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    pub to: PartyId,
    pub event: PartnerEvent,
}

impl Outbound {
    pub fn new(to: PartyId, event: PartnerEvent) -> Self {
        Self { to, event }
    }
}
