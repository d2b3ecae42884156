//! Tally and resolution engine.
//!
//! State machine:
//! - OPEN --(deadline passed, decision rule)--> PASSED | REJECTED
//! - PASSED --(external execution confirmed)--> EXECUTED
//!
//! Status writes are compare-and-set against both the observed status and
//! the observed vote count, so an evaluation never finalizes on a snapshot
//! that is missing a durably accepted vote.

use crate::core::{Clock, Error, ProposalId, Result};
use crate::governance::proposal::{Proposal, ProposalStatus};
use crate::governance::tally::{ResolutionOutcome, Tally};
use crate::store::{ProposalFilter, ProposalStore, StatusChange, StatusUpdate, VoteFilter};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Actor recorded for transitions made by the engine itself.
pub const ENGINE_ACTOR: &str = "tally-engine";

/// Re-reads allowed when votes land between a snapshot and its status write.
const MAX_EVALUATION_ATTEMPTS: usize = 8;

/// Evaluates proposals and enacts status transitions.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn ProposalStore>,
    clock: Arc<dyn Clock>,
}

impl Resolver {
    pub fn new(store: Arc<dyn ProposalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Evaluate a proposal and resolve it if its voting window has closed.
    ///
    /// Idempotent: an already-resolved proposal is returned unchanged and
    /// nothing is written.
    pub async fn evaluate(&self, proposal_id: &ProposalId) -> Result<ResolutionOutcome> {
        for _ in 0..MAX_EVALUATION_ATTEMPTS {
            let proposal = self.load(proposal_id).await?;
            let tally = self.current_tally(proposal_id).await?;
            let mut outcome = ResolutionOutcome {
                proposal_id: proposal_id.clone(),
                status: proposal.status,
                previous_status: proposal.status,
                quorum: proposal.quorum,
                quorum_met: tally.quorum_met(proposal.quorum),
                tally,
                transitioned: false,
            };

            if !proposal.is_open() {
                return Ok(outcome);
            }

            let now = self.clock.now();
            let Some(next) = tally.decide(proposal.quorum, proposal.deadline_passed(now)) else {
                return Ok(outcome);
            };

            let change = StatusChange {
                proposal_id: proposal_id.clone(),
                expected: ProposalStatus::Open,
                new: next,
                expected_vote_count: Some(tally.vote_count),
                at: now,
                actor: ENGINE_ACTOR.to_string(),
            };

            match self.store.update_proposal_status(change).await? {
                StatusUpdate::Applied(updated) => {
                    info!(
                        proposal_id = %proposal_id,
                        status = %updated.status,
                        total_weight = %tally.total_weight,
                        quorum = %proposal.quorum,
                        "proposal resolved"
                    );
                    outcome.status = updated.status;
                    outcome.transitioned = true;
                    return Ok(outcome);
                }
                StatusUpdate::Conflict { current, vote_count } if current == ProposalStatus::Open => {
                    debug!(
                        proposal_id = %proposal_id,
                        seen = tally.vote_count,
                        current = vote_count,
                        "votes changed during evaluation, re-reading"
                    );
                }
                StatusUpdate::Conflict { current, .. } => {
                    debug!(proposal_id = %proposal_id, status = %current, "resolved concurrently");
                    let proposal = self.load(proposal_id).await?;
                    let tally = self.current_tally(proposal_id).await?;
                    return Ok(ResolutionOutcome {
                        proposal_id: proposal_id.clone(),
                        status: proposal.status,
                        previous_status: ProposalStatus::Open,
                        quorum: proposal.quorum,
                        quorum_met: tally.quorum_met(proposal.quorum),
                        tally,
                        transitioned: false,
                    });
                }
            }
        }

        warn!(proposal_id = %proposal_id, "evaluation kept racing with vote acceptance");
        Err(Error::EvaluationContended {
            proposal_id: proposal_id.clone(),
            attempts: MAX_EVALUATION_ATTEMPTS,
        })
    }

    /// Record external confirmation that a PASSED proposal was executed.
    pub async fn confirm_execution(&self, proposal_id: &ProposalId, confirmed_by: &str) -> Result<Proposal> {
        let proposal = self.load(proposal_id).await?;
        if proposal.status != ProposalStatus::Passed {
            return Err(Error::InvalidTransition {
                proposal_id: proposal_id.clone(),
                from: proposal.status,
                to: ProposalStatus::Executed,
            });
        }

        let change = StatusChange {
            proposal_id: proposal_id.clone(),
            expected: ProposalStatus::Passed,
            new: ProposalStatus::Executed,
            expected_vote_count: None,
            at: self.clock.now(),
            actor: confirmed_by.to_string(),
        };

        match self.store.update_proposal_status(change).await? {
            StatusUpdate::Applied(updated) => {
                info!(proposal_id = %proposal_id, confirmed_by, "proposal executed");
                Ok(updated)
            }
            StatusUpdate::Conflict { current, .. } => Err(Error::InvalidTransition {
                proposal_id: proposal_id.clone(),
                from: current,
                to: ProposalStatus::Executed,
            }),
        }
    }

    /// Evaluate every OPEN proposal whose deadline has passed.
    ///
    /// Entry point for a scheduled check. A failure on one proposal is
    /// logged and does not stop the sweep.
    pub async fn evaluate_expired(&self) -> Result<Vec<ResolutionOutcome>> {
        let now = self.clock.now();
        let (open, _) = self
            .store
            .list_proposals(&ProposalFilter::new().by_status(ProposalStatus::Open))
            .await?;

        let mut outcomes = Vec::new();
        for proposal in open.iter().filter(|p| p.deadline_passed(now)) {
            match self.evaluate(&proposal.id).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(proposal_id = %proposal.id, error = %e, "expired proposal evaluation failed"),
            }
        }

        if !outcomes.is_empty() {
            info!(resolved = outcomes.len(), "deadline sweep complete");
        }
        Ok(outcomes)
    }

    /// Current tally for a proposal, read-only.
    pub async fn current_tally(&self, proposal_id: &ProposalId) -> Result<Tally> {
        let votes = self
            .store
            .find_votes(&VoteFilter::for_proposal(proposal_id))
            .await?;
        Tally::from_votes(&votes)
    }

    async fn load(&self, proposal_id: &ProposalId) -> Result<Proposal> {
        self.store
            .find_proposal(proposal_id)
            .await?
            .ok_or_else(|| Error::ProposalNotFound(proposal_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{now, ManualClock};
    use crate::decimal::Decimal;
    use crate::governance::{NewProposal, ProposalDraft, StatusTransition, Vote, VoteChoice, VoteDraft};
    use crate::store::{BackendType, GovernanceCounts, MemoryStore, VoteInsert};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        resolver: Resolver,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(now()));
        let resolver = Resolver::new(store.clone(), clock.clone());
        Fixture { store, clock, resolver }
    }

    impl Fixture {
        async fn proposal(&self, quorum: &str, deadline: Option<Duration>) -> Proposal {
            let created = self.clock.now();
            let mut request = NewProposal::new("Upgrade oracle", "alice", quorum);
            if let Some(after) = deadline {
                request = request.with_deadline(created + after);
            }
            self.store
                .insert_proposal(request.into_draft(created).unwrap())
                .await
                .unwrap()
        }

        async fn vote(&self, proposal: &Proposal, voter: &str, choice: VoteChoice, weight: u64) {
            self.store
                .insert_vote_if_absent(VoteDraft {
                    proposal_id: proposal.id.clone(),
                    voter_id: voter.to_string(),
                    choice,
                    weight: Decimal::from_units(weight),
                    cast_at: self.clock.now(),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_open_before_deadline_even_with_quorum() {
        let fx = fixture();
        let p = fx.proposal("100", Some(Duration::hours(1))).await;
        fx.vote(&p, "a", VoteChoice::For, 500).await;

        let outcome = fx.resolver.evaluate(&p.id).await.unwrap();
        assert_eq!(outcome.status, ProposalStatus::Open);
        assert!(outcome.quorum_met);
        assert!(!outcome.transitioned);
    }

    #[tokio::test]
    async fn test_passes_after_deadline() {
        let fx = fixture();
        let p = fx.proposal("100", Some(Duration::hours(1))).await;
        fx.vote(&p, "a", VoteChoice::For, 40).await;
        fx.vote(&p, "b", VoteChoice::For, 40).await;
        fx.vote(&p, "c", VoteChoice::Against, 30).await;
        fx.clock.advance(Duration::hours(2));

        let outcome = fx.resolver.evaluate(&p.id).await.unwrap();
        assert_eq!(outcome.status, ProposalStatus::Passed);
        assert_eq!(outcome.previous_status, ProposalStatus::Open);
        assert!(outcome.transitioned);
        assert_eq!(outcome.tally.total_weight, Decimal::from_units(110));
    }

    #[tokio::test]
    async fn test_rejected_without_quorum() {
        let fx = fixture();
        let p = fx.proposal("100", Some(Duration::hours(1))).await;
        fx.vote(&p, "a", VoteChoice::For, 30).await;
        fx.clock.advance(Duration::hours(2));

        let outcome = fx.resolver.evaluate(&p.id).await.unwrap();
        assert_eq!(outcome.status, ProposalStatus::Rejected);
        assert!(!outcome.quorum_met);
    }

    #[tokio::test]
    async fn test_evaluate_is_idempotent() {
        let fx = fixture();
        let p = fx.proposal("10", Some(Duration::hours(1))).await;
        fx.vote(&p, "a", VoteChoice::For, 10).await;
        fx.clock.advance(Duration::hours(2));

        let first = fx.resolver.evaluate(&p.id).await.unwrap();
        let second = fx.resolver.evaluate(&p.id).await.unwrap();
        assert!(first.transitioned);
        assert!(!second.transitioned);
        assert_eq!(first.status, second.status);
        assert_eq!(fx.store.list_transitions(Some(&p.id)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_deadline_stays_open() {
        let fx = fixture();
        let p = fx.proposal("1", None).await;
        fx.vote(&p, "a", VoteChoice::For, 5).await;
        fx.clock.advance(Duration::days(365));

        let outcome = fx.resolver.evaluate(&p.id).await.unwrap();
        assert_eq!(outcome.status, ProposalStatus::Open);
    }

    #[tokio::test]
    async fn test_evaluate_unknown_proposal() {
        let fx = fixture();
        let err = fx.resolver.evaluate(&ProposalId::new("nope")).await.unwrap_err();
        assert!(matches!(err, Error::ProposalNotFound(_)));
    }

    #[tokio::test]
    async fn test_confirm_execution() {
        let fx = fixture();
        let p = fx.proposal("10", Some(Duration::hours(1))).await;
        fx.vote(&p, "a", VoteChoice::For, 10).await;
        fx.clock.advance(Duration::hours(2));
        fx.resolver.evaluate(&p.id).await.unwrap();

        let executed = fx.resolver.confirm_execution(&p.id, "relayer").await.unwrap();
        assert_eq!(executed.status, ProposalStatus::Executed);

        let again = fx.resolver.confirm_execution(&p.id, "relayer").await.unwrap_err();
        assert_eq!(
            again,
            Error::InvalidTransition {
                proposal_id: p.id.clone(),
                from: ProposalStatus::Executed,
                to: ProposalStatus::Executed,
            }
        );
    }

    #[tokio::test]
    async fn test_confirm_execution_requires_passed() {
        let fx = fixture();
        let open = fx.proposal("10", Some(Duration::hours(1))).await;
        let err = fx.resolver.confirm_execution(&open.id, "relayer").await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { from: ProposalStatus::Open, .. }));

        fx.clock.advance(Duration::hours(2));
        fx.resolver.evaluate(&open.id).await.unwrap();
        let err = fx.resolver.confirm_execution(&open.id, "relayer").await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { from: ProposalStatus::Rejected, .. }));
    }

    #[tokio::test]
    async fn test_evaluate_expired_sweeps_only_past_deadline() {
        let fx = fixture();
        let short = fx.proposal("1", Some(Duration::minutes(10))).await;
        let long = fx.proposal("1", Some(Duration::hours(10))).await;
        let forever = fx.proposal("1", None).await;
        fx.clock.advance(Duration::hours(1));

        let outcomes = fx.resolver.evaluate_expired().await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].proposal_id, short.id);
        assert_eq!(outcomes[0].status, ProposalStatus::Rejected);

        for id in [&long.id, &forever.id] {
            let p = fx.store.find_proposal(id).await.unwrap().unwrap();
            assert_eq!(p.status, ProposalStatus::Open);
        }
    }

    #[tokio::test]
    async fn test_concurrent_evaluations_transition_once() {
        let fx = fixture();
        let p = fx.proposal("10", Some(Duration::hours(1))).await;
        fx.vote(&p, "a", VoteChoice::For, 10).await;
        fx.clock.advance(Duration::hours(2));

        let runs = futures::future::join_all((0..16).map(|_| fx.resolver.evaluate(&p.id))).await;
        let transitioned = runs
            .into_iter()
            .map(|r| r.unwrap())
            .inspect(|o| assert_eq!(o.status, ProposalStatus::Passed))
            .filter(|o| o.transitioned)
            .count();
        assert_eq!(transitioned, 1);
    }

    /// Lands a new vote just before every status write, so each
    /// compare-and-set sees a changed vote count.
    struct VoteFloodStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl ProposalStore for VoteFloodStore {
        async fn find_proposal(&self, id: &ProposalId) -> Result<Option<Proposal>> {
            self.inner.find_proposal(id).await
        }
        async fn insert_proposal(&self, draft: ProposalDraft) -> Result<Proposal> {
            self.inner.insert_proposal(draft).await
        }
        async fn update_proposal_status(&self, change: StatusChange) -> Result<StatusUpdate> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner
                .insert_vote_if_absent(VoteDraft {
                    proposal_id: change.proposal_id.clone(),
                    voter_id: format!("late-{}", n),
                    choice: VoteChoice::For,
                    weight: Decimal::from_units(1),
                    cast_at: change.at - Duration::hours(2),
                })
                .await?;
            self.inner.update_proposal_status(change).await
        }
        async fn insert_vote_if_absent(&self, draft: VoteDraft) -> Result<VoteInsert> {
            self.inner.insert_vote_if_absent(draft).await
        }
        async fn list_votes(&self, proposal_id: &ProposalId, limit: usize, offset: usize) -> Result<(Vec<Vote>, u64)> {
            self.inner.list_votes(proposal_id, limit, offset).await
        }
        async fn find_votes(&self, filter: &VoteFilter) -> Result<Vec<Vote>> {
            self.inner.find_votes(filter).await
        }
        async fn list_proposals(&self, filter: &ProposalFilter) -> Result<(Vec<Proposal>, u64)> {
            self.inner.list_proposals(filter).await
        }
        async fn count_proposals(&self, filter: &ProposalFilter) -> Result<u64> {
            self.inner.count_proposals(filter).await
        }
        async fn count_votes(&self, filter: &VoteFilter) -> Result<u64> {
            self.inner.count_votes(filter).await
        }
        async fn average_vote_weight(&self, digits: u32) -> Result<Decimal> {
            self.inner.average_vote_weight(digits).await
        }
        async fn governance_counts(&self) -> Result<GovernanceCounts> {
            self.inner.governance_counts().await
        }
        async fn list_transitions(&self, proposal_id: Option<&ProposalId>) -> Result<Vec<StatusTransition>> {
            self.inner.list_transitions(proposal_id).await
        }
        fn backend_type(&self) -> BackendType {
            self.inner.backend_type()
        }
        async fn close(&self) -> Result<()> {
            self.inner.close().await
        }
    }

    #[tokio::test]
    async fn test_unsettled_evaluation_reports_contention() {
        let clock = Arc::new(ManualClock::new(now()));
        let store = Arc::new(VoteFloodStore {
            inner: MemoryStore::new(),
            writes: AtomicUsize::new(0),
        });
        let created = clock.now();
        let proposal = store
            .insert_proposal(
                NewProposal::new("Busy", "alice", "1")
                    .with_deadline(created + Duration::hours(1))
                    .into_draft(created)
                    .unwrap(),
            )
            .await
            .unwrap();
        clock.advance(Duration::hours(2));

        let resolver = Resolver::new(store.clone(), clock.clone());
        let err = resolver.evaluate(&proposal.id).await.unwrap_err();

        assert_eq!(
            err,
            Error::EvaluationContended {
                proposal_id: proposal.id.clone(),
                attempts: MAX_EVALUATION_ATTEMPTS,
            }
        );
        assert!(err.is_transient());
        assert_eq!(store.writes.load(Ordering::SeqCst), MAX_EVALUATION_ATTEMPTS);
        assert!(store.list_transitions(Some(&proposal.id)).await.unwrap().is_empty());
    }
}
