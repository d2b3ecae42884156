//! Audit entry structure.
//!
//! An entry is either an action recorded by this engine or an event
//! observed on the ledger. The two are never merged into one record.

use crate::chain::OnChainEvent;
use crate::core::{ProposalId, Timestamp};
use crate::governance::{Proposal, StatusTransition, Vote};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Kind of off-chain action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ProposalCreated,
    VoteCast,
    StatusChanged,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ProposalCreated => "proposal_created",
            ActionKind::VoteCast => "vote_cast",
            ActionKind::StatusChanged => "status_changed",
        }
    }
}

/// An action performed through this engine and persisted in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffChainAction {
    /// Stable identifier derived from the source record
    pub id: String,
    pub kind: ActionKind,
    pub proposal_id: ProposalId,
    pub actor: String,
    pub timestamp: Timestamp,
    pub details: HashMap<String, serde_json::Value>,
}

impl OffChainAction {
    pub fn proposal_created(proposal: &Proposal) -> Self {
        let mut details = HashMap::new();
        details.insert("title".to_string(), serde_json::Value::from(proposal.title.clone()));
        details.insert("quorum".to_string(), serde_json::Value::from(proposal.quorum.to_string()));
        Self {
            id: format!("proposal:{}", proposal.id),
            kind: ActionKind::ProposalCreated,
            proposal_id: proposal.id.clone(),
            actor: proposal.proposer_id.clone(),
            timestamp: proposal.created_at,
            details,
        }
    }

    pub fn vote_cast(vote: &Vote) -> Self {
        let mut details = HashMap::new();
        details.insert("choice".to_string(), serde_json::Value::from(vote.choice.as_str()));
        details.insert("weight".to_string(), serde_json::Value::from(vote.weight.to_string()));
        Self {
            id: format!("vote:{}", vote.id),
            kind: ActionKind::VoteCast,
            proposal_id: vote.proposal_id.clone(),
            actor: vote.voter_id.clone(),
            timestamp: vote.cast_at,
            details,
        }
    }

    pub fn status_changed(transition: &StatusTransition) -> Self {
        let mut details = HashMap::new();
        details.insert("from".to_string(), serde_json::Value::from(transition.from.as_str()));
        details.insert("to".to_string(), serde_json::Value::from(transition.to.as_str()));
        Self {
            // A proposal reaches each status at most once.
            id: format!("transition:{}:{}", transition.proposal_id, transition.to),
            kind: ActionKind::StatusChanged,
            proposal_id: transition.proposal_id.clone(),
            actor: transition.actor.clone(),
            timestamp: transition.at,
            details,
        }
    }
}

/// One row of the reconciled audit log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AuditEntry {
    OffChain(OffChainAction),
    OnChain(OnChainEvent),
}

impl AuditEntry {
    pub fn id(&self) -> &str {
        match self {
            AuditEntry::OffChain(a) => &a.id,
            AuditEntry::OnChain(e) => &e.id,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            AuditEntry::OffChain(a) => a.timestamp,
            AuditEntry::OnChain(e) => e.timestamp,
        }
    }

    pub fn actor(&self) -> &str {
        match self {
            AuditEntry::OffChain(a) => &a.actor,
            AuditEntry::OnChain(e) => &e.actor,
        }
    }

    pub fn proposal_id(&self) -> &ProposalId {
        match self {
            AuditEntry::OffChain(a) => &a.proposal_id,
            AuditEntry::OnChain(e) => &e.proposal_id,
        }
    }

    pub fn action(&self) -> &str {
        match self {
            AuditEntry::OffChain(a) => a.kind.as_str(),
            AuditEntry::OnChain(e) => &e.kind,
        }
    }

    pub fn is_on_chain(&self) -> bool {
        matches!(self, AuditEntry::OnChain(_))
    }

    /// SHA3-256 over the canonical fields, hex encoded.
    pub fn fingerprint(&self) -> String {
        let source = if self.is_on_chain() { "on_chain" } else { "off_chain" };
        let data = format!(
            "{}:{}:{}:{}:{}:{}",
            source,
            self.id(),
            self.proposal_id(),
            self.actor(),
            self.action(),
            self.timestamp().to_rfc3339()
        );

        let mut hasher = Sha3_256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Audit log order: newest first, off-chain before on-chain on equal
    /// timestamps, then by id.
    pub fn log_order(a: &AuditEntry, b: &AuditEntry) -> Ordering {
        b.timestamp()
            .cmp(&a.timestamp())
            .then_with(|| a.is_on_chain().cmp(&b.is_on_chain()))
            .then_with(|| a.id().cmp(b.id()))
    }
}
