//! Error types for govtally.

use crate::core::types::{ProposalId, Timestamp, VoteId};
use crate::governance::ProposalStatus;
use thiserror::Error;

/// Result type alias for govtally operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in govtally operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Lookup errors
    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    // Vote acceptance errors
    #[error("Proposal {proposal_id} is closed (status: {status})")]
    ProposalClosed {
        proposal_id: ProposalId,
        status: ProposalStatus,
    },

    #[error("Voting deadline for proposal {proposal_id} passed at {deadline} (now: {now})")]
    DeadlinePassed {
        proposal_id: ProposalId,
        deadline: Timestamp,
        now: Timestamp,
    },

    #[error("Invalid weight: {0}")]
    InvalidWeight(String),

    #[error("Invalid vote: {0}")]
    InvalidVote(String),

    #[error("Voter {voter_id} already voted on proposal {proposal_id} (vote {existing_vote})")]
    DuplicateVote {
        proposal_id: ProposalId,
        voter_id: String,
        existing_vote: VoteId,
    },

    // Lifecycle errors
    #[error("Invalid transition for proposal {proposal_id}: {from} -> {to}")]
    InvalidTransition {
        proposal_id: ProposalId,
        from: ProposalStatus,
        to: ProposalStatus,
    },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Evaluation of proposal {proposal_id} did not settle after {attempts} attempts")]
    EvaluationContended { proposal_id: ProposalId, attempts: usize },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    // Collaborator errors
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("On-chain source unavailable: {0}")]
    OnChainSourceUnavailable(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a caller may retry the failed operation with backoff.
    ///
    /// Collaborator outages and evaluations starved by a stream of incoming
    /// votes are transient. A `DuplicateVote` is the final outcome for the
    /// loser of a race and must not be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::StoreUnavailable(_)
                | Error::OnChainSourceUnavailable(_)
                | Error::EvaluationContended { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
