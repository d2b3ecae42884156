//! ProposalStore trait definition.
//!
//! The durable record of proposals and votes. The engine holds no long-lived
//! copies of store state; every operation reads, evaluates and writes back
//! through this contract, relying on the store's own atomic primitives.

use crate::core::{ProposalId, Result, Timestamp};
use crate::decimal::Decimal;
use crate::governance::{
    Proposal, ProposalDraft, ProposalStatus, StatusTransition, Vote, VoteDraft,
};
use crate::store::filter::{ProposalFilter, VoteFilter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend type identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// Process-local store guarded by a single write lock
    Memory,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = crate::core::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendType::Memory),
            other => Err(crate::core::Error::Config(format!(
                "unknown store backend '{}'",
                other
            ))),
        }
    }
}

/// Compare-and-set request for a proposal's status.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusChange {
    pub proposal_id: ProposalId,
    /// Status the caller observed
    pub expected: ProposalStatus,
    pub new: ProposalStatus,
    /// Vote count the caller's decision was based on. When set, the change
    /// only applies if no vote has been accepted since.
    pub expected_vote_count: Option<u64>,
    pub at: Timestamp,
    pub actor: String,
}

/// Outcome of a status compare-and-set.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusUpdate {
    /// Change applied; carries the updated proposal
    Applied(Proposal),
    /// Precondition failed; carries the state actually found
    Conflict {
        current: ProposalStatus,
        vote_count: u64,
    },
}

/// Why a conditional vote insert was refused before the uniqueness check.
#[derive(Clone, Debug, PartialEq)]
pub enum VoteRejection {
    ProposalMissing,
    NotOpen(ProposalStatus),
    DeadlinePassed(Timestamp),
}

/// Outcome of a conditional vote insert.
#[derive(Clone, Debug, PartialEq)]
pub enum VoteInsert {
    /// The vote was persisted
    Inserted(Vote),
    /// The voter already has a vote on this proposal; nothing was written
    AlreadyExists(Vote),
    /// The proposal no longer accepts votes; nothing was written
    Rejected(VoteRejection),
}

/// Store-wide counts read at a single point in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GovernanceCounts {
    /// Every status is present, zero when no proposal has it
    pub proposals_by_status: BTreeMap<ProposalStatus, u64>,
    pub total_proposals: u64,
    pub total_votes: u64,
    /// Sum of every vote's weight
    pub total_weight: Decimal,
}

/// Core trait for proposal stores.
///
/// Implementations must make `insert_vote_if_absent` and
/// `update_proposal_status` atomic: the preconditions they check and the
/// write they perform happen as one unit with respect to concurrent callers.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Read a proposal by ID.
    async fn find_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>>;

    /// Persist a new OPEN proposal. The store assigns the ID.
    async fn insert_proposal(&self, draft: ProposalDraft) -> Result<Proposal>;

    /// Compare-and-set a proposal's status, recording the transition.
    async fn update_proposal_status(&self, change: StatusChange) -> Result<StatusUpdate>;

    /// Insert a vote unless one exists for (proposal, voter).
    ///
    /// Re-checks that the proposal exists, is OPEN and that `cast_at` is
    /// within its deadline, in the same atomic step as the uniqueness check.
    async fn insert_vote_if_absent(&self, draft: VoteDraft) -> Result<VoteInsert>;

    /// Page through a proposal's votes in insertion order.
    async fn list_votes(
        &self,
        proposal_id: &ProposalId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Vote>, u64)>;

    /// Every vote matching a filter, in insertion order.
    async fn find_votes(&self, filter: &VoteFilter) -> Result<Vec<Vote>>;

    /// Proposals matching a filter, newest first, plus the unpaginated total.
    async fn list_proposals(&self, filter: &ProposalFilter) -> Result<(Vec<Proposal>, u64)>;

    /// Count proposals matching a filter (pagination ignored).
    async fn count_proposals(&self, filter: &ProposalFilter) -> Result<u64>;

    /// Count votes matching a filter.
    async fn count_votes(&self, filter: &VoteFilter) -> Result<u64>;

    /// Mean weight over all votes, rounded half-up to `digits`.
    async fn average_vote_weight(&self, digits: u32) -> Result<Decimal>;

    /// Proposal counts, vote count and weight sum, all from one consistent
    /// view of the store.
    async fn governance_counts(&self) -> Result<GovernanceCounts>;

    /// Status transitions, oldest first, optionally for one proposal.
    async fn list_transitions(&self, proposal_id: Option<&ProposalId>) -> Result<Vec<StatusTransition>>;

    /// Get the backend type.
    fn backend_type(&self) -> BackendType;

    /// Health check for the backend.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Release the store. Every later call fails with `StoreUnavailable`.
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_display() {
        assert_eq!(BackendType::Memory.to_string(), "memory");
    }

    #[test]
    fn test_backend_type_parse() {
        assert_eq!("Memory".parse::<BackendType>().unwrap(), BackendType::Memory);
        assert!("postgres".parse::<BackendType>().is_err());
    }
}
