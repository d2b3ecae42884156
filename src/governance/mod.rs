//! Proposal governance
//!
//! Provides:
//! - Proposal and vote models
//! - Atomic vote acceptance
//! - Weighted tally and resolution
//! - The engine facade and deadline sweeper

pub mod acceptance;
pub mod config;
pub mod engine;
pub mod proposal;
pub mod resolution;
pub mod sweeper;
pub mod tally;
pub mod vote;

pub use acceptance::VoteAcceptor;
pub use config::EngineConfig;
pub use engine::{GovernanceEngine, Submitted};
pub use proposal::{NewProposal, Proposal, ProposalDraft, ProposalStatus, StatusTransition};
pub use resolution::{Resolver, ENGINE_ACTOR};
pub use sweeper::DeadlineSweeper;
pub use tally::{ResolutionOutcome, Tally};
pub use vote::{Vote, VoteChoice, VoteDraft, VoteRequest};
