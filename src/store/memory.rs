//! In-memory store implementation.
//!
//! All state sits behind one `RwLock`. Conditional writes (vote insert,
//! status compare-and-set) check and write under a single write guard, which
//! is this backend's atomic constraint mechanism. No guard is held across an
//! `.await`.

use crate::core::{Error, ProposalId, Result, VoteId};
use crate::decimal::Decimal;
use crate::governance::{
    Proposal, ProposalDraft, ProposalStatus, StatusTransition, Vote, VoteDraft,
};
use crate::store::backend::{
    BackendType, GovernanceCounts, ProposalStore, StatusChange, StatusUpdate, VoteInsert,
    VoteRejection,
};
use crate::store::filter::{ProposalFilter, VoteFilter};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct StoreState {
    proposals: HashMap<ProposalId, Proposal>,
    /// Proposal IDs in insertion order
    proposal_order: Vec<ProposalId>,
    /// Votes in insertion order
    votes: Vec<Vote>,
    /// (proposal, voter) -> index into `votes`; the uniqueness constraint
    vote_index: HashMap<(ProposalId, String), usize>,
    /// proposal -> number of accepted votes
    vote_counts: HashMap<ProposalId, u64>,
    transitions: Vec<StatusTransition>,
}

impl StoreState {
    fn total_weight(&self) -> Result<Decimal> {
        Decimal::checked_sum(self.votes.iter().map(|v| v.weight))
            .ok_or_else(|| Error::Internal("total vote weight overflows".to_string()))
    }
}

/// Process-local proposal store.
pub struct MemoryStore {
    state: RwLock<StoreState>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Open a new, empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::StoreUnavailable("store is closed".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.ensure_open()?;
        self.state
            .read()
            .map_err(|_| Error::StoreUnavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.ensure_open()?;
        self.state
            .write()
            .map_err(|_| Error::StoreUnavailable("store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProposalStore for MemoryStore {
    async fn find_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>> {
        let state = self.read()?;
        Ok(state.proposals.get(id).cloned())
    }

    async fn insert_proposal(&self, draft: ProposalDraft) -> Result<Proposal> {
        let mut state = self.write()?;
        let id = ProposalId::generate();
        let proposal = draft.into_proposal(id.clone());

        state.proposals.insert(id.clone(), proposal.clone());
        state.proposal_order.push(id);
        Ok(proposal)
    }

    async fn update_proposal_status(&self, change: StatusChange) -> Result<StatusUpdate> {
        let mut state = self.write()?;
        let vote_count = state.vote_counts.get(&change.proposal_id).copied().unwrap_or(0);

        let proposal = state
            .proposals
            .get_mut(&change.proposal_id)
            .ok_or_else(|| Error::ProposalNotFound(change.proposal_id.clone()))?;

        let stale_votes = change
            .expected_vote_count
            .map_or(false, |expected| expected != vote_count);
        if proposal.status != change.expected || stale_votes {
            return Ok(StatusUpdate::Conflict {
                current: proposal.status,
                vote_count,
            });
        }

        if !proposal.status.can_transition_to(change.new) {
            return Err(Error::InvalidTransition {
                proposal_id: change.proposal_id,
                from: proposal.status,
                to: change.new,
            });
        }

        proposal.status = change.new;
        let updated = proposal.clone();
        state.transitions.push(StatusTransition {
            proposal_id: change.proposal_id,
            from: change.expected,
            to: change.new,
            at: change.at,
            actor: change.actor,
        });

        Ok(StatusUpdate::Applied(updated))
    }

    async fn insert_vote_if_absent(&self, draft: VoteDraft) -> Result<VoteInsert> {
        let mut state = self.write()?;

        let Some(proposal) = state.proposals.get(&draft.proposal_id) else {
            return Ok(VoteInsert::Rejected(VoteRejection::ProposalMissing));
        };
        if proposal.status != ProposalStatus::Open {
            return Ok(VoteInsert::Rejected(VoteRejection::NotOpen(proposal.status)));
        }
        if let Some(deadline) = proposal.deadline {
            if draft.cast_at > deadline {
                return Ok(VoteInsert::Rejected(VoteRejection::DeadlinePassed(deadline)));
            }
        }

        let key = (draft.proposal_id.clone(), draft.voter_id.clone());
        if let Some(&index) = state.vote_index.get(&key) {
            return Ok(VoteInsert::AlreadyExists(state.votes[index].clone()));
        }

        let sequence = state.votes.len() as u64 + 1;
        let vote = draft.into_vote(VoteId::generate(), sequence);
        let index = state.votes.len();
        state.votes.push(vote.clone());
        state.vote_index.insert(key, index);
        *state.vote_counts.entry(vote.proposal_id.clone()).or_insert(0) += 1;

        Ok(VoteInsert::Inserted(vote))
    }

    async fn list_votes(
        &self,
        proposal_id: &ProposalId,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Vote>, u64)> {
        let state = self.read()?;
        let matching: Vec<&Vote> = state
            .votes
            .iter()
            .filter(|v| &v.proposal_id == proposal_id)
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn find_votes(&self, filter: &VoteFilter) -> Result<Vec<Vote>> {
        let state = self.read()?;
        Ok(state
            .votes
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    async fn list_proposals(&self, filter: &ProposalFilter) -> Result<(Vec<Proposal>, u64)> {
        let state = self.read()?;
        let matching: Vec<Proposal> = state
            .proposal_order
            .iter()
            .rev()
            .filter_map(|id| state.proposals.get(id))
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let items = match filter.page {
            Some(page) => page.apply(matching),
            None => matching,
        };
        Ok((items, total))
    }

    async fn count_proposals(&self, filter: &ProposalFilter) -> Result<u64> {
        let state = self.read()?;
        Ok(state.proposals.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn count_votes(&self, filter: &VoteFilter) -> Result<u64> {
        let state = self.read()?;
        Ok(state.votes.iter().filter(|v| filter.matches(v)).count() as u64)
    }

    async fn average_vote_weight(&self, digits: u32) -> Result<Decimal> {
        let state = self.read()?;
        let total = state.total_weight()?;
        Ok(Decimal::average(total, state.votes.len() as u64, digits))
    }

    async fn governance_counts(&self) -> Result<GovernanceCounts> {
        let state = self.read()?;
        let mut proposals_by_status: BTreeMap<ProposalStatus, u64> =
            ProposalStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for proposal in state.proposals.values() {
            *proposals_by_status.entry(proposal.status).or_insert(0) += 1;
        }
        Ok(GovernanceCounts {
            proposals_by_status,
            total_proposals: state.proposals.len() as u64,
            total_votes: state.votes.len() as u64,
            total_weight: state.total_weight()?,
        })
    }

    async fn list_transitions(&self, proposal_id: Option<&ProposalId>) -> Result<Vec<StatusTransition>> {
        let state = self.read()?;
        Ok(state
            .transitions
            .iter()
            .filter(|t| proposal_id.map_or(true, |id| &t.proposal_id == id))
            .cloned()
            .collect())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.closed.load(Ordering::Acquire) && !self.state.is_poisoned())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
