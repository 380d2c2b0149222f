//! Barter Script - RON loader for trade content
//!
//! Loads trade content from RON files:
//! - Item type definitions (the catalog)
//! - Trade configuration (timeouts, queue bound)
//! - Starting inventories per party

mod error;
mod loader;

pub use error::{Error, Result};
pub use loader::{InventorySeed, Loader, TradeDefs};
