//! RON content loader

use crate::error::{Error, Result};
use barter_core::{ItemCatalog, ItemDef, ItemId, ItemInstance, PartyId};
use barter_session::{MemoryInventory, TradeConfig};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Items a party starts with
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InventorySeed {
    pub party: PartyId,
    pub items: Vec<ItemInstance>,
}

/// Loaded trade content
#[derive(Debug, Default)]
pub struct TradeDefs {
    pub catalog: ItemCatalog,
    /// Defaults unless a config file was loaded
    pub config: TradeConfig,
    pub inventories: IndexMap<PartyId, Vec<ItemInstance>>,
}

impl TradeDefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an in-memory inventory holding every seeded party's items
    pub fn seed_inventory(&self) -> MemoryInventory {
        let mut inventory = MemoryInventory::new();
        for (party, items) in &self.inventories {
            inventory.set_items(party.clone(), items.clone());
        }
        inventory
    }

    /// Check that every seeded item has a catalogued type and a unique id
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&ItemId> = HashSet::new();
        for item in self.inventories.values().flatten() {
            if !self.catalog.is_empty() {
                self.catalog.require(&item.item_type)?;
            }
            if !seen.insert(&item.id) {
                return Err(Error::DuplicateDefinition(format!("item {}", item.id)));
            }
        }
        Ok(())
    }
}

/// Loader for RON trade content
#[derive(Default)]
pub struct Loader {
    defs: TradeDefs,
    config_loaded: bool,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a single RON file
    ///
    /// The kind of content is taken from the file name, then from the
    /// top-level field it declares. Inventories are recognised first since
    /// every seed carries its own `items:` list.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        debug!(file = %path.display(), "loading trade content");

        if filename.contains("inventor") || content.contains("inventories:") {
            self.load_inventories_str(&content)
        } else if filename.contains("item") || content.contains("items:") {
            self.load_items_str(&content)
        } else if filename.contains("config") {
            self.load_config_str(&content)
        } else {
            Err(Error::InvalidContent(format!(
                "cannot tell what {} contains",
                path.display()
            )))
        }
    }

    /// Load all RON files from a directory, recursively
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        entries.sort();

        for file_path in entries {
            if file_path.extension().map(|e| e == "ron").unwrap_or(false) {
                self.load_file(&file_path)?;
            } else if file_path.is_dir() {
                self.load_directory(&file_path)?;
            }
        }
        Ok(())
    }

    /// Load item type definitions from a RON string
    pub fn load_items_str(&mut self, content: &str) -> Result<()> {
        #[derive(Deserialize)]
        struct ItemFile {
            items: Vec<ItemDef>,
        }

        let file: ItemFile = ron::from_str(content)?;
        for def in file.items {
            self.defs.catalog.insert(def)?;
        }
        Ok(())
    }

    /// Load the trade configuration from a RON string
    ///
    /// Omitted fields keep their defaults. Only one configuration may be
    /// loaded.
    pub fn load_config_str(&mut self, content: &str) -> Result<()> {
        if self.config_loaded {
            return Err(Error::DuplicateDefinition("trade config".to_string()));
        }
        let config: TradeConfig = ron::from_str(content)?;
        let max_queued = config.max_queued_requests;
        self.defs.config = config.with_max_queued_requests(max_queued);
        self.config_loaded = true;
        Ok(())
    }

    /// Load starting inventories from a RON string
    pub fn load_inventories_str(&mut self, content: &str) -> Result<()> {
        #[derive(Deserialize)]
        struct InventoryFile {
            inventories: Vec<InventorySeed>,
        }

        let file: InventoryFile = ron::from_str(content)?;
        for seed in file.inventories {
            if self.defs.inventories.contains_key(&seed.party) {
                return Err(Error::DuplicateDefinition(seed.party.to_string()));
            }
            self.defs.inventories.insert(seed.party, seed.items);
        }
        Ok(())
    }

    pub fn defs(&self) -> &TradeDefs {
        &self.defs
    }

    /// Validate and take the loaded content
    pub fn finish(self) -> Result<TradeDefs> {
        self.defs.validate()?;
        Ok(self.defs)
    }
}
