//! Store factory.
//!
//! Opens a store handle from configuration. The handle is explicitly
//! constructed and injected; there is no process-wide store.

use crate::core::Result;
use crate::store::backend::{BackendType, ProposalStore};
use crate::store::config::StoreConfig;
use crate::store::memory::MemoryStore;
use std::sync::Arc;

/// Open a store from configuration.
///
/// Returns an Arc-wrapped handle for shared ownership. Call
/// [`ProposalStore::close`] when done.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ProposalStore>> {
    match config.backend {
        BackendType::Memory => {
            tracing::debug!(backend = %config.backend, "opening proposal store");
            Ok(Arc::new(MemoryStore::new()) as Arc<dyn ProposalStore>)
        }
    }
}
