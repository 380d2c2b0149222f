//! Offer model: the items one party puts into a trade plus its confirmation

use crate::item::{ItemInstance, ItemRef};
use crate::stack::{group, StackedGroup};
use crate::ItemId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One party's proposed set of items
///
/// Holds references only, never ownership. `confirmed` is forced back to
/// `false` by every successful insertion or removal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    items: IndexMap<ItemId, ItemRef>,
    confirmed: bool,
    /// Bumped on every successful add/remove
    revision: u64,
}

impl Offer {
    /// Create an empty, unconfirmed offer
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an item into the offer
    ///
    /// Returns `false` without mutating if an item with the same id is
    /// already offered.
    pub fn add(&mut self, item: ItemRef) -> bool {
        if self.items.contains_key(&item.id) {
            return false;
        }
        self.items.insert(item.id.clone(), item);
        self.touch();
        true
    }

    /// Take an item out of the offer
    ///
    /// Returns `false` if no offered item has that id.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        if self.items.shift_remove(id).is_none() {
            return false;
        }
        self.touch();
        true
    }

    /// Mark the offer as confirmed
    ///
    /// Does not check ownership; the authority re-validates at commit.
    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// Withdraw confirmation
    pub fn unconfirm(&mut self) {
        self.confirmed = false;
    }

    /// Empty the offer and drop confirmation
    pub fn clear(&mut self) {
        self.items.clear();
        self.confirmed = false;
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&ItemRef> {
        self.items.get(id)
    }

    /// Offered items in insertion order
    pub fn items(&self) -> impl Iterator<Item = &ItemRef> {
        self.items.values()
    }

    /// Offered ids in insertion order
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Offered items grouped into stacks
    pub fn stacks(&self) -> Vec<StackedGroup<ItemRef>> {
        let refs: Vec<ItemRef> = self.items.values().cloned().collect();
        group(&refs)
    }

    /// Stacks of `owned` that are not yet in this offer
    ///
    /// What an inventory panel shows as still available to offer.
    pub fn available_stacks(&self, owned: &[ItemInstance]) -> Vec<StackedGroup<ItemInstance>> {
        let remaining: Vec<ItemInstance> = owned
            .iter()
            .filter(|item| !self.items.contains_key(&item.id))
            .cloned()
            .collect();
        group(&remaining)
    }

    fn touch(&mut self) {
        self.confirmed = false;
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Rarity;

    fn egg(id: &str) -> ItemRef {
        ItemInstance::with_rarity(id, "Egg", Rarity::Common).to_ref()
    }

    #[test]
    fn test_add_rejects_duplicate() {
        let mut offer = Offer::new();
        assert!(offer.add(egg("e1")));
        offer.confirm();

        assert!(!offer.add(egg("e1")));
        assert_eq!(offer.len(), 1);
        // A failed add is not a mutation
        assert!(offer.is_confirmed());
        assert_eq!(offer.revision(), 1);
    }

    #[test]
    fn test_remove_absent_fails() {
        let mut offer = Offer::new();
        offer.add(egg("e1"));
        offer.confirm();

        assert!(!offer.remove(&ItemId::new("e2")));
        assert!(offer.is_confirmed());
        assert_eq!(offer.len(), 1);
    }

    #[test]
    fn test_mutation_invalidates_confirmation() {
        let mut offer = Offer::new();
        let ops: Vec<(bool, &str)> = vec![
            (true, "e1"),
            (true, "e2"),
            (false, "e1"),
            (true, "e3"),
            (false, "e2"),
            (true, "e1"),
        ];

        for (is_add, id) in ops {
            offer.confirm();
            let changed = if is_add {
                offer.add(egg(id))
            } else {
                offer.remove(&ItemId::new(id))
            };
            assert!(changed);
            assert!(!offer.is_confirmed(), "confirmed must drop after touching {}", id);
        }
        assert_eq!(offer.item_ids(), vec![ItemId::new("e3"), ItemId::new("e1")]);
    }

    #[test]
    fn test_confirm_unconfirm() {
        let mut offer = Offer::new();
        offer.confirm();
        assert!(offer.is_confirmed());
        offer.unconfirm();
        assert!(!offer.is_confirmed());
    }

    #[test]
    fn test_clear() {
        let mut offer = Offer::new();
        offer.add(egg("e1"));
        offer.confirm();
        offer.clear();
        assert!(offer.is_empty());
        assert!(!offer.is_confirmed());
    }

    #[test]
    fn test_stacks_and_available() {
        let owned = vec![
            ItemInstance::with_rarity("e1", "Egg", Rarity::Common),
            ItemInstance::with_rarity("e2", "Egg", Rarity::Common),
            ItemInstance::with_rarity("c1", "Chicken", Rarity::Rare),
        ];
        let mut offer = Offer::new();
        offer.add(owned[0].to_ref());
        offer.add(owned[2].to_ref());

        let offered = offer.stacks();
        assert_eq!(offered.len(), 2);
        assert_eq!(offered[0].count, 1);

        let available = offer.available_stacks(&owned);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].stack_key.as_str(), "Egg_Common");
        assert_eq!(available[0].member_ids, vec![ItemId::new("e2")]);
    }
}
