//! Read-only item catalog: item type → static display metadata

use crate::item::{ItemInstance, Rarity};
use crate::{Error, ItemType, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Static metadata for an item type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub item_type: ItemType,
    pub display_name: String,
    /// Rarity shown when an instance carries none
    #[serde(default)]
    pub default_rarity: Option<Rarity>,
    #[serde(default)]
    pub description: String,
}

impl ItemDef {
    pub fn new(item_type: impl Into<ItemType>, display_name: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            display_name: display_name.into(),
            default_rarity: None,
            description: String::new(),
        }
    }

    pub fn with_default_rarity(mut self, rarity: Rarity) -> Self {
        self.default_rarity = Some(rarity);
        self
    }
}

/// Catalog of item definitions, in load order
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    defs: IndexMap<ItemType, ItemDef>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition
    ///
    /// Fails if the item type is already defined.
    pub fn insert(&mut self, def: ItemDef) -> Result<()> {
        if self.defs.contains_key(&def.item_type) {
            return Err(Error::DuplicateItemType(def.item_type.to_string()));
        }
        self.defs.insert(def.item_type.clone(), def);
        Ok(())
    }

    pub fn get(&self, item_type: &ItemType) -> Option<&ItemDef> {
        self.defs.get(item_type)
    }

    /// Look up a definition that must exist
    pub fn require(&self, item_type: &ItemType) -> Result<&ItemDef> {
        self.get(item_type)
            .ok_or_else(|| Error::UnknownItemType(item_type.to_string()))
    }

    pub fn contains(&self, item_type: &ItemType) -> bool {
        self.defs.contains_key(item_type)
    }

    /// Display name for an instance, falling back to its raw type
    pub fn display_name(&self, item: &ItemInstance) -> String {
        self.get(&item.item_type)
            .map(|def| def.display_name.clone())
            .unwrap_or_else(|| item.item_type.to_string())
    }

    /// Effective rarity of an instance
    ///
    /// For display only; stack keys never consult the catalog.
    pub fn rarity_of(&self, item: &ItemInstance) -> Option<Rarity> {
        item.attributes
            .rarity
            .or_else(|| self.get(&item.item_type).and_then(|def| def.default_rarity))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemDef> {
        self.defs.values()
    }
}
