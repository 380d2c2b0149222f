//! Error types for barter-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown item type: {0}")]
    UnknownItemType(String),

    #[error("Duplicate item type definition: {0}")]
    DuplicateItemType(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
