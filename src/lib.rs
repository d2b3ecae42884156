//! # govtally - Governance Proposal Tally Engine
//!
//! Tracks governance proposals and weighted votes:
//! - **Vote acceptance**: exactly one vote per voter per proposal, atomically
//! - **Resolution**: quorum and deadline evaluation with monotonic status
//! - **Audit**: store actions reconciled with on-chain events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use govtally::governance::{EngineConfig, GovernanceEngine, NewProposal, VoteChoice, VoteRequest};
//! use govtally::store::open_store;
//!
//! #[tokio::main]
//! async fn main() -> govtally::Result<()> {
//!     let config = EngineConfig::from_env()?;
//!     let engine = GovernanceEngine::new(open_store(&config.store).await?, config);
//!
//!     let proposal = engine
//!         .create_proposal(NewProposal::new("Raise limit", "alice", "100"))
//!         .await?
//!         .record;
//!     engine
//!         .submit_vote(VoteRequest::new(&proposal.id, "bob", VoteChoice::For, "40"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod chain;
pub mod core;
pub mod decimal;
pub mod governance;
pub mod logging;
pub mod metrics;
pub mod store;

pub use core::error::{Error, Result};
