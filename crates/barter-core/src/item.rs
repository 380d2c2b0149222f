//! Owned item instances and the references offers keep to them

use crate::stack::StackKey;
use crate::{ItemId, ItemType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rarity grade of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        };
        f.write_str(name)
    }
}

/// Per-instance attributes
///
/// Only `rarity` and `tier` take part in stacking; `extra` is carried for
/// display and is never compared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemAttributes {
    #[serde(default)]
    pub rarity: Option<Rarity>,
    #[serde(default)]
    pub tier: Option<u32>,
    #[serde(default)]
    pub extra: IndexMap<String, String>,
}

impl ItemAttributes {
    pub fn with_rarity(rarity: Rarity) -> Self {
        Self {
            rarity: Some(rarity),
            ..Default::default()
        }
    }

    pub fn with_tier(tier: u32) -> Self {
        Self {
            tier: Some(tier),
            ..Default::default()
        }
    }
}

/// An owned, uniquely identified unit held by a party
///
/// Created and destroyed only by the simulation; the trade subsystem reads
/// instances and refers to them by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInstance {
    pub id: ItemId,
    pub item_type: ItemType,
    #[serde(default)]
    pub attributes: ItemAttributes,
}

impl ItemInstance {
    /// Create an instance with the given attributes
    pub fn new(id: impl Into<ItemId>, item_type: impl Into<ItemType>, attributes: ItemAttributes) -> Self {
        Self {
            id: id.into(),
            item_type: item_type.into(),
            attributes,
        }
    }

    /// Create an instance graded by rarity
    pub fn with_rarity(id: impl Into<ItemId>, item_type: impl Into<ItemType>, rarity: Rarity) -> Self {
        Self::new(id, item_type, ItemAttributes::with_rarity(rarity))
    }

    /// Set an extra display attribute
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.extra.insert(key.into(), value.into());
        self
    }

    /// Stack key of this instance
    pub fn stack_key(&self) -> StackKey {
        StackKey::derive(&self.item_type, &self.attributes)
    }

    /// The reference an offer stores for this instance
    pub fn to_ref(&self) -> ItemRef {
        ItemRef {
            id: self.id.clone(),
            item_type: self.item_type.clone(),
            stack_key: self.stack_key(),
        }
    }
}

/// What an offer keeps of an item: enough to identify and group it
///
/// Authoritative attributes are read from the owner's inventory at display
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: ItemId,
    pub item_type: ItemType,
    pub stack_key: StackKey,
}

impl From<&ItemInstance> for ItemRef {
    fn from(item: &ItemInstance) -> Self {
        item.to_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_ref_keeps_id_type_and_key() {
        let egg = ItemInstance::with_rarity("e1", "Egg", Rarity::Common).with_extra("laid_by", "Henrietta");
        let r = egg.to_ref();
        assert_eq!(r.id, ItemId::new("e1"));
        assert_eq!(r.item_type, ItemType::new("Egg"));
        assert_eq!(r.stack_key.as_str(), "Egg_Common");
    }

    #[test]
    fn test_instance_from_ron() {
        let item: ItemInstance = ron::from_str(
            r#"(id: "c1", item_type: "Chicken", attributes: (rarity: Some(Rare)))"#,
        )
        .unwrap();
        assert_eq!(item.attributes.rarity, Some(Rarity::Rare));
        assert!(item.attributes.extra.is_empty());
    }
}
