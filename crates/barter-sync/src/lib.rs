//! Barter Sync - Keeping two trade controllers in step
//!
//! Each party runs its own `TradeController`. This crate carries the
//! `PartnerEvent`s they produce across a connection:
//!
//! - **Transport**: the [`Connection`] trait, plus an in-process [`LoopbackConnection`]
//! - **Codec**: versioned bincode frames around an `Envelope`
//! - **Adapter**: [`SyncAdapter`] pumps frames in and flushes controller output
//!
//! # Architecture
//!
//! ```text
//! TradeController ──drain_outbound──▶ SyncAdapter ──frame──▶ Connection
//!        ▲                                                      │
//!        └──────────handle_inbound◀── SyncAdapter ◀──frame──────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let (mine, theirs) = LoopbackConnection::pair("alice", "bob");
//! let mut sync = SyncAdapter::new("alice");
//! sync.connect(mine);
//!
//! // Game loop
//! loop {
//!     sync.pump_inbound(&mut controller);
//!     handle_user_input(&mut controller);
//!     sync.flush_outbound(&mut controller);
//! }
//! ```

pub mod codec;
mod adapter;
mod error;
mod transport;

pub use adapter::{SyncAdapter, SyncStats};
pub use error::{Error, Result};
pub use transport::{Connection, LoopbackConnection, LoopbackError};
