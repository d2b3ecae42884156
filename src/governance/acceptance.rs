//! Vote acceptance protocol.
//!
//! Preconditions, in reporting order:
//! 1. the proposal exists
//! 2. the proposal is OPEN
//! 3. the deadline (if any) has not passed
//! 4. the weight is a positive decimal
//! 5. the voter has no vote on the proposal yet
//!
//! Checks 1-3 run first against a fresh read for a fast, descriptive
//! rejection. The store's conditional insert then re-checks 1-3 together
//! with 5 in one atomic step, so concurrent submissions for the same voter
//! yield exactly one vote.

use crate::core::{Clock, Error, Result, Timestamp};
use crate::decimal::Decimal;
use crate::governance::proposal::Proposal;
use crate::governance::vote::{Vote, VoteDraft, VoteRequest};
use crate::store::{ProposalStore, VoteInsert, VoteRejection};
use std::sync::Arc;
use tracing::{debug, info};

/// Accepts votes against the current persisted state.
#[derive(Clone)]
pub struct VoteAcceptor {
    store: Arc<dyn ProposalStore>,
    clock: Arc<dyn Clock>,
}

impl VoteAcceptor {
    pub fn new(store: Arc<dyn ProposalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Accept a vote, or explain why it was refused.
    ///
    /// Either the vote is fully persisted having satisfied every
    /// precondition, or nothing is written.
    pub async fn accept(&self, request: VoteRequest) -> Result<Vote> {
        let proposal = self
            .store
            .find_proposal(&request.proposal_id)
            .await?
            .ok_or_else(|| Error::ProposalNotFound(request.proposal_id.clone()))?;

        let now = self.clock.now();
        check_open(&proposal)?;
        check_deadline(&proposal, now)?;
        let weight = Decimal::parse_positive(&request.weight)?;

        let draft = VoteDraft {
            proposal_id: request.proposal_id,
            voter_id: request.voter_id,
            choice: request.choice,
            weight,
            cast_at: now,
        };

        match self.store.insert_vote_if_absent(draft.clone()).await? {
            VoteInsert::Inserted(vote) => {
                info!(
                    proposal_id = %vote.proposal_id,
                    voter_id = %vote.voter_id,
                    choice = %vote.choice,
                    weight = %vote.weight,
                    "vote accepted"
                );
                Ok(vote)
            }
            VoteInsert::AlreadyExists(existing) => {
                debug!(
                    proposal_id = %draft.proposal_id,
                    voter_id = %draft.voter_id,
                    existing_vote = %existing.id,
                    "duplicate vote refused"
                );
                Err(Error::DuplicateVote {
                    proposal_id: draft.proposal_id,
                    voter_id: draft.voter_id,
                    existing_vote: existing.id,
                })
            }
            VoteInsert::Rejected(VoteRejection::ProposalMissing) => {
                Err(Error::ProposalNotFound(draft.proposal_id))
            }
            VoteInsert::Rejected(VoteRejection::NotOpen(status)) => Err(Error::ProposalClosed {
                proposal_id: draft.proposal_id,
                status,
            }),
            VoteInsert::Rejected(VoteRejection::DeadlinePassed(deadline)) => {
                Err(Error::DeadlinePassed {
                    proposal_id: draft.proposal_id,
                    deadline,
                    now,
                })
            }
        }
    }
}

fn check_open(proposal: &Proposal) -> Result<()> {
    if !proposal.is_open() {
        return Err(Error::ProposalClosed {
            proposal_id: proposal.id.clone(),
            status: proposal.status,
        });
    }
    Ok(())
}

fn check_deadline(proposal: &Proposal, now: Timestamp) -> Result<()> {
    match proposal.deadline {
        Some(deadline) if proposal.deadline_passed(now) => Err(Error::DeadlinePassed {
            proposal_id: proposal.id.clone(),
            deadline,
            now,
        }),
        _ => Ok(()),
    }
}
