//! Store configuration.
//!
//! Configuration-driven backend selection.

use crate::store::backend::BackendType;
use serde::{Deserialize, Serialize};

/// Store layer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type to use
    pub backend: BackendType,
}

impl StoreConfig {
    /// In-memory store config.
    pub fn memory() -> Self {
        Self {
            backend: BackendType::Memory,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::memory()
    }
}
