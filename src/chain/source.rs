//! On-chain event observation.
//!
//! The engine consumes confirmed ledger events through `OnChainSource`. The
//! source may be transiently unavailable; readers must tolerate that.

use crate::core::{Error, ProposalId, Result, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// An action observed as confirmed on the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnChainEvent {
    /// Ledger-assigned identifier (transaction hash or event id)
    pub id: String,
    pub proposal_id: ProposalId,
    /// Account that signed the transaction
    pub actor: String,
    /// Contract event topic, e.g. `vote_cast`
    pub kind: String,
    pub ledger: u64,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl OnChainEvent {
    pub fn new(id: &str, proposal_id: &ProposalId, actor: &str, kind: &str, timestamp: Timestamp) -> Self {
        Self {
            id: id.to_string(),
            proposal_id: proposal_id.clone(),
            actor: actor.to_string(),
            kind: kind.to_string(),
            ledger: 0,
            timestamp,
            attributes: HashMap::new(),
        }
    }

    pub fn with_ledger(mut self, ledger: u64) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.attributes.insert(key.to_string(), v);
        }
        self
    }
}

/// Supplier of on-chain events.
#[async_trait]
pub trait OnChainSource: Send + Sync {
    /// Events oldest first, optionally for one proposal and at or after `since`.
    ///
    /// Fails with `OnChainSourceUnavailable` when the ledger cannot be read.
    async fn list_events(
        &self,
        proposal_id: Option<&ProposalId>,
        since: Option<Timestamp>,
    ) -> Result<Vec<OnChainEvent>>;
}

/// Event feed held in memory, fed by an external observer or by tests.
pub struct MemoryEventSource {
    events: RwLock<Vec<OnChainEvent>>,
    available: AtomicBool,
}

impl MemoryEventSource {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Append an observed event.
    pub fn push(&self, event: OnChainEvent) {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        events.push(event);
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }

    /// Simulate the ledger going down or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }
}

impl Default for MemoryEventSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OnChainSource for MemoryEventSource {
    async fn list_events(
        &self,
        proposal_id: Option<&ProposalId>,
        since: Option<Timestamp>,
    ) -> Result<Vec<OnChainEvent>> {
        if !self.available.load(Ordering::Acquire) {
            return Err(Error::OnChainSourceUnavailable("event feed offline".to_string()));
        }

        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        Ok(events
            .iter()
            .filter(|e| proposal_id.map_or(true, |id| &e.proposal_id == id))
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
            .cloned()
            .collect())
    }
}
