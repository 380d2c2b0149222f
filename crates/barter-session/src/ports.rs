//! Boundary to the authoritative simulation
//!
//! The trade subsystem never moves items. It reaches the authority through
//! two narrow calls on [`CommitAuthority`] and reads ownership through
//! [`Inventory`]. Commit results come back later as a [`CommitOutcome`].

use barter_core::{ItemId, ItemInstance, PartyId, PartyInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Identifies one commit attempt
///
/// A late outcome whose ticket no longer matches the active session is
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitTicket(pub u64);

/// A mutually confirmed trade handed to the authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitProposal {
    pub ticket: CommitTicket,
    pub local_party: PartyId,
    pub partner: PartyId,
    /// Items leaving the local party
    pub local_item_ids: Vec<ItemId>,
    /// Items arriving from the partner
    pub partner_item_ids: Vec<ItemId>,
}

impl CommitProposal {
    /// Whether `other` is the partner's view of the same trade
    pub fn mirrors(&self, other: &CommitProposal) -> bool {
        self.local_party == other.partner
            && self.partner == other.local_party
            && same_ids(&self.local_item_ids, &other.partner_item_ids)
            && same_ids(&self.partner_item_ids, &other.local_item_ids)
    }
}

fn same_ids(a: &[ItemId], b: &[ItemId]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Why the authority refused a commit
///
/// The reasons are informational; callers must not infer anything else
/// from them.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CommitRejection {
    #[error("item no longer owned: {0}")]
    ItemNoLongerOwned(ItemId),

    #[error("offers do not match")]
    OfferMismatch,

    #[error("party unavailable: {0}")]
    PartyUnavailable(PartyId),

    #[error("{0}")]
    Other(String),
}

/// Result of a commit attempt, delivered asynchronously
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub ticket: CommitTicket,
    pub result: Result<(), CommitRejection>,
}

impl CommitOutcome {
    pub fn success(ticket: CommitTicket) -> Self {
        Self {
            ticket,
            result: Ok(()),
        }
    }

    pub fn rejected(ticket: CommitTicket, rejection: CommitRejection) -> Self {
        Self {
            ticket,
            result: Err(rejection),
        }
    }
}

/// The trusted component that owns items and performs transfers
pub trait CommitAuthority {
    /// Announce that `from` opened a trade with `to`
    fn request_trade(&mut self, from: &PartyInfo, to: &PartyId);

    /// Ask for a mutually confirmed trade to be executed
    ///
    /// The answer is fed back through the controller's
    /// `handle_commit_outcome`.
    fn submit_commit(&mut self, proposal: CommitProposal);
}

/// Read access to owned items
pub trait Inventory {
    /// Items currently owned by `party`
    ///
    /// Must be idempotent: reading never consumes anything.
    fn owned_items(&self, party: &PartyId) -> Vec<ItemInstance>;

    /// Look up one owned item
    fn find_item(&self, party: &PartyId, id: &ItemId) -> Option<ItemInstance> {
        self.owned_items(party).into_iter().find(|item| &item.id == id)
    }
}

impl<T: Inventory + ?Sized> Inventory for &T {
    fn owned_items(&self, party: &PartyId) -> Vec<ItemInstance> {
        (**self).owned_items(party)
    }
}

/// Inventory snapshot held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryInventory {
    owned: HashMap<PartyId, Vec<ItemInstance>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything a party owns
    pub fn set_items(&mut self, party: PartyId, items: Vec<ItemInstance>) {
        self.owned.insert(party, items);
    }

    /// Give one item to a party
    pub fn give(&mut self, party: &PartyId, item: ItemInstance) {
        self.owned.entry(party.clone()).or_default().push(item);
    }

    /// Take one item away from a party
    pub fn take(&mut self, party: &PartyId, id: &ItemId) -> Option<ItemInstance> {
        let items = self.owned.get_mut(party)?;
        let pos = items.iter().position(|item| &item.id == id)?;
        Some(items.remove(pos))
    }

    /// Move items from one party to another
    ///
    /// All-or-nothing: fails with the first id `from` does not own.
    pub fn transfer(&mut self, from: &PartyId, to: &PartyId, ids: &[ItemId]) -> Result<(), ItemId> {
        if let Some(missing) = ids.iter().find(|id| self.find_item(from, id).is_none()) {
            return Err(missing.clone());
        }
        for id in ids {
            if let Some(item) = self.take(from, id) {
                self.give(to, item);
            }
        }
        Ok(())
    }
}

impl Inventory for MemoryInventory {
    fn owned_items(&self, party: &PartyId) -> Vec<ItemInstance> {
        self.owned.get(party).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barter_core::Rarity;

    fn proposal(ticket: u64, local: &str, partner: &str, give: &[&str], get: &[&str]) -> CommitProposal {
        CommitProposal {
            ticket: CommitTicket(ticket),
            local_party: PartyId::new(local),
            partner: PartyId::new(partner),
            local_item_ids: give.iter().map(|id| ItemId::new(*id)).collect(),
            partner_item_ids: get.iter().map(|id| ItemId::new(*id)).collect(),
        }
    }

    #[test]
    fn test_mirrors() {
        let a = proposal(1, "alice", "bob", &["e1", "e2"], &["c1"]);
        let b = proposal(9, "bob", "alice", &["c1"], &["e2", "e1"]);
        let c = proposal(9, "bob", "alice", &["c1"], &["e1"]);
        assert!(a.mirrors(&b));
        assert!(b.mirrors(&a));
        assert!(!a.mirrors(&c));
    }

    #[test]
    fn test_transfer_all_or_nothing() {
        let alice = PartyId::new("alice");
        let bob = PartyId::new("bob");
        let mut inventory = MemoryInventory::new();
        inventory.set_items(
            alice.clone(),
            vec![
                ItemInstance::with_rarity("e1", "Egg", Rarity::Common),
                ItemInstance::with_rarity("e2", "Egg", Rarity::Common),
            ],
        );

        let err = inventory
            .transfer(&alice, &bob, &[ItemId::new("e1"), ItemId::new("x9")])
            .unwrap_err();
        assert_eq!(err, ItemId::new("x9"));
        assert_eq!(inventory.owned_items(&alice).len(), 2);

        inventory.transfer(&alice, &bob, &[ItemId::new("e2")]).unwrap();
        assert_eq!(inventory.owned_items(&alice).len(), 1);
        assert_eq!(inventory.owned_items(&bob)[0].id, ItemId::new("e2"));
    }

    #[test]
    fn test_owned_items_is_idempotent() {
        let alice = PartyId::new("alice");
        let mut inventory = MemoryInventory::new();
        inventory.give(&alice, ItemInstance::with_rarity("c1", "Chicken", Rarity::Rare));

        assert_eq!(inventory.owned_items(&alice), inventory.owned_items(&alice));
        assert!(inventory.find_item(&alice, &ItemId::new("c1")).is_some());
        assert!(inventory.owned_items(&PartyId::new("nobody")).is_empty());
    }
}
