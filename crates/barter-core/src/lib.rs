//! Barter Core - Item stacking and offer model for peer-to-peer trading
//!
//! This crate provides the data model shared by the trade subsystem:
//! - Identity types (`ItemId`, `ItemType`, `PartyId`)
//! - Owned item instances and the `ItemRef`s offers keep to them
//! - The read-only `ItemCatalog`
//! - The stacking engine (`group`, `resolve_selection`, `toggle_selection`)
//! - The `Offer` model with its confirmation flag
//! - The `PartnerEvent` vocabulary exchanged between parties
//!
//! Nothing here creates, destroys or transfers items. Ownership lives with
//! the authoritative simulation.

mod catalog;
mod error;
mod identity;
pub mod item;
mod msg;
mod offer;
pub mod stack;

pub use catalog::{ItemCatalog, ItemDef};
pub use error::{Error, Result};
pub use identity::{ItemId, ItemType, PartyId, PartyInfo};
pub use item::{ItemAttributes, ItemInstance, ItemRef, Rarity};
pub use msg::{Envelope, Outbound, PartnerEvent};
pub use offer::Offer;
pub use stack::{
    find_group, group, resolve_selection, toggle_selection, SelectionAction, StackKey, Stackable,
    StackedGroup,
};

/// Logical time supplied by the embedding simulation
pub type Tick = u64;
