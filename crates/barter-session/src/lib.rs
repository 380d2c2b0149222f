//! Barter Session - Trade negotiation for one local party
//!
//! This crate drives a peer-to-peer trade from invitation to commit on the
//! local side. Each party runs its own controller; the two sides stay in
//! step by exchanging `PartnerEvent`s.
//!
//! ## Architecture
//!
//! ```text
//! TradeController (one per local party)
//!  │
//!  ├── TradeSession ← at most one, two Offers + status
//!  ├── RequestQueue ← inbound invitations, FIFO
//!  ├── Observers    ← rendering hooks
//!  │
//!  ├── CommitAuthority (trait) ← validates and applies the swap
//!  └── Inventory (trait)       ← read-only view of owned items
//! ```
//!
//! ## Key Components
//!
//! - [`TradeController`]: Owns the session, queue and hooks
//! - [`TradeSession`]: The Pending → Negotiating → Confirming state machine
//! - [`RequestQueue`]: Bounded FIFO of trade requests
//! - [`CommitAuthority`] / [`Inventory`]: Ports to the authoritative simulation
//!
//! ## Design Principles
//!
//! 1. **The controller never moves items** - only the commit authority does
//! 2. **Single commit attempt** - issued once on entering Confirming
//! 3. **Inbound violations are dropped** - logged, never applied partially

mod config;
mod controller;
mod error;
mod history;
pub mod hooks;
pub mod ports;
mod queue;
mod session;
mod state;

pub use config::TradeConfig;
pub use controller::TradeController;
pub use error::{ProtocolError, Result};
pub use history::{TradeHistory, TradeOutcome, TradeRecord};
pub use hooks::{Observers, OfferSide, SubscriptionId, TradeAction, TradeEvent};
pub use ports::{
    CommitAuthority, CommitOutcome, CommitProposal, CommitRejection, CommitTicket, Inventory,
    MemoryInventory,
};
pub use queue::{Enqueued, RequestQueue, TradeRequest};
pub use session::TradeSession;
pub use state::{CancelReason, TradeStatus};
