//! Audit log reconciliation.
//!
//! Merges actions recorded in the store with events observed on the ledger
//! into one newest-first sequence. Neither source is deduplicated against
//! the other. An unavailable ledger degrades the on-chain portion to empty.

use crate::audit::entry::{AuditEntry, OffChainAction};
use crate::audit::filter::AuditFilter;
use crate::chain::OnChainSource;
use crate::core::{Error, Result};
use crate::store::{Pagination, ProposalFilter, ProposalStore, VoteFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Availability of the on-chain source for one audit read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceStatus {
    Available,
    Degraded { reason: String },
}

impl SourceStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SourceStatus::Degraded { .. })
    }
}

/// One page of the reconciled audit log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub entries: Vec<AuditEntry>,
    /// On-chain entries in the full merged sequence, not just this page
    pub on_chain_count: u64,
    /// Size of the full merged sequence
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
    pub on_chain: SourceStatus,
}

/// Reconciles store actions with ledger events.
#[derive(Clone)]
pub struct AuditReconciler {
    store: Arc<dyn ProposalStore>,
    chain: Arc<dyn OnChainSource>,
}

impl AuditReconciler {
    pub fn new(store: Arc<dyn ProposalStore>, chain: Arc<dyn OnChainSource>) -> Self {
        Self { store, chain }
    }

    /// Read a page of the merged audit log.
    ///
    /// Fails only if the store fails. A ledger outage yields the off-chain
    /// entries with `on_chain` marked degraded.
    pub async fn get_audit_log(&self, filter: &AuditFilter, page: Pagination) -> Result<AuditLog> {
        let (off_chain, on_chain) = futures::join!(
            self.off_chain_entries(filter),
            self.chain.list_events(filter.proposal_id.as_ref(), filter.since)
        );
        let off_chain = off_chain?;

        let (on_chain, status) = match on_chain {
            Ok(events) => (events, SourceStatus::Available),
            Err(Error::OnChainSourceUnavailable(reason)) => {
                warn!(reason = %reason, "on-chain source unavailable, serving off-chain audit entries only");
                (Vec::new(), SourceStatus::Degraded { reason })
            }
            Err(e) => return Err(e),
        };

        let on_chain: Vec<AuditEntry> = on_chain
            .into_iter()
            .map(AuditEntry::OnChain)
            .filter(|e| filter.matches(e))
            .collect();
        let on_chain_count = on_chain.len() as u64;

        let mut merged = off_chain;
        merged.extend(on_chain);
        merged.sort_by(AuditEntry::log_order);
        let total = merged.len() as u64;

        debug!(total, on_chain_count, degraded = status.is_degraded(), "audit log merged");

        Ok(AuditLog {
            entries: page.apply(merged),
            on_chain_count,
            total,
            limit: page.limit,
            offset: page.offset,
            on_chain: status,
        })
    }

    async fn off_chain_entries(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let (proposals, votes) = match &filter.proposal_id {
            Some(id) => {
                let proposal = self.store.find_proposal(id).await?;
                let votes = self.store.find_votes(&VoteFilter::for_proposal(id)).await?;
                (proposal.into_iter().collect::<Vec<_>>(), votes)
            }
            None => {
                let (proposals, _) = self.store.list_proposals(&ProposalFilter::new()).await?;
                let votes = self.store.find_votes(&VoteFilter::new()).await?;
                (proposals, votes)
            }
        };
        let transitions = self.store.list_transitions(filter.proposal_id.as_ref()).await?;

        let actions = proposals
            .iter()
            .map(OffChainAction::proposal_created)
            .chain(votes.iter().map(OffChainAction::vote_cast))
            .chain(transitions.iter().map(OffChainAction::status_changed));

        Ok(actions
            .map(AuditEntry::OffChain)
            .filter(|e| filter.matches(e))
            .collect())
    }
}
