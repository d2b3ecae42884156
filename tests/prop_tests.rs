use std::sync::Arc;

use chrono::Duration;
use proptest::prelude::*;

use govtally::audit::{AuditFilter, AuditReconciler};
use govtally::chain::{MemoryEventSource, OnChainEvent};
use govtally::core::{now, Clock, ManualClock};
use govtally::decimal::Decimal;
use govtally::governance::{
    EngineConfig, GovernanceEngine, NewProposal, ProposalStatus, Tally, VoteChoice, VoteRequest,
};
use govtally::store::{MemoryStore, Pagination, ProposalStore};

fn choice() -> impl Strategy<Value = VoteChoice> {
    prop_oneof![
        Just(VoteChoice::For),
        Just(VoteChoice::Against),
        Just(VoteChoice::Abstain),
    ]
}

/// Weights in raw units, from one raw unit up to a million whole units.
fn weight() -> impl Strategy<Value = Decimal> {
    (1u128..10_000_000_000_000u128).prop_map(Decimal::from_raw)
}

fn tally_of(votes: &[(VoteChoice, Decimal)]) -> Tally {
    let mut tally = Tally::default();
    for (choice, weight) in votes {
        tally.add(*choice, *weight).unwrap();
    }
    tally
}

proptest! {
    /// Quorum exactly at total weight is met; one raw unit above is not.
    #[test]
    fn quorum_boundary_is_inclusive(votes in prop::collection::vec((choice(), weight()), 1..20)) {
        let tally = tally_of(&votes);
        let at = tally.total_weight;
        let above = Decimal::from_raw(at.raw() + 1);

        prop_assert!(tally.quorum_met(at));
        prop_assert!(!tally.quorum_met(above));
        prop_assert_eq!(tally.decide(above, true), Some(ProposalStatus::Rejected));

        let expected = if tally.for_weight > tally.against_weight {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Rejected
        };
        prop_assert_eq!(tally.decide(at, true), Some(expected));
        prop_assert_eq!(tally.decide(at, false), None);
    }

    /// Raising the quorum never turns a rejection into a pass.
    #[test]
    fn decision_monotonic_in_quorum(
        votes in prop::collection::vec((choice(), weight()), 0..20),
        q1 in 1u128..20_000_000_000_000u128,
        q2 in 1u128..20_000_000_000_000u128,
    ) {
        let tally = tally_of(&votes);
        let (low, high) = (Decimal::from_raw(q1.min(q2)), Decimal::from_raw(q1.max(q2)));

        if tally.decide(low, true) == Some(ProposalStatus::Rejected) {
            prop_assert_eq!(tally.decide(high, true), Some(ProposalStatus::Rejected));
        }
    }

    /// Tally is independent of vote order.
    #[test]
    fn tally_order_independent(votes in prop::collection::vec((choice(), weight()), 0..20)) {
        let mut reversed = votes.clone();
        reversed.reverse();
        prop_assert_eq!(tally_of(&votes), tally_of(&reversed));
    }

    /// Averaging an unchanged set yields the identical string every time.
    #[test]
    fn average_is_stable(
        weights in prop::collection::vec(weight(), 1..30),
        digits in 0u32..=7,
    ) {
        let total = Decimal::checked_sum(weights.iter().copied()).unwrap();
        let first = Decimal::average(total, weights.len() as u64, digits).to_fixed(digits);
        let second = Decimal::average(total, weights.len() as u64, digits).to_fixed(digits);
        prop_assert_eq!(first, second);
    }

    /// Canonical decimal strings parse back to the same value.
    #[test]
    fn decimal_display_parses_back(w in weight()) {
        let parsed: Decimal = w.to_string().parse().unwrap();
        prop_assert_eq!(parsed, w);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Evaluating a resolved proposal changes nothing.
    #[test]
    fn evaluate_idempotent(votes in prop::collection::vec((choice(), 1u64..50), 0..8), quorum in 1u64..200) {
        tokio_test::block_on(async {
            let clock = Arc::new(ManualClock::new(now()));
            let engine = GovernanceEngine::new(Arc::new(MemoryStore::new()), EngineConfig::default())
                .with_clock(clock.clone());
            let proposal = engine
                .create_proposal(
                    NewProposal::new("p", "alice", &quorum.to_string())
                        .with_deadline(clock.now() + Duration::hours(1)),
                )
                .await
                .unwrap()
                .record;
            for (i, (choice, weight)) in votes.iter().enumerate() {
                engine
                    .submit_vote(VoteRequest::new(&proposal.id, &format!("v{}", i), *choice, &weight.to_string()))
                    .await
                    .unwrap();
            }
            clock.advance(Duration::hours(2));

            let first = engine.evaluate(&proposal.id).await.unwrap();
            let second = engine.evaluate(&proposal.id).await.unwrap();
            let history = engine.store().list_transitions(Some(&proposal.id)).await.unwrap();

            assert!(first.is_final());
            assert_eq!(first.status, second.status);
            assert_eq!(first.tally, second.tally);
            assert!(!second.transitioned);
            assert_eq!(history.len(), 1);
        });
    }

    /// Merged audit log keeps every entry from both sources, newest first.
    #[test]
    fn audit_merge_preserves_counts(
        vote_offsets in prop::collection::vec(0i64..3600, 0..10),
        event_offsets in prop::collection::vec(0i64..3600, 0..10),
        chain_up in any::<bool>(),
    ) {
        tokio_test::block_on(async {
            let start = now();
            let clock = Arc::new(ManualClock::new(start));
            let store: Arc<dyn ProposalStore> = Arc::new(MemoryStore::new());
            let chain = Arc::new(MemoryEventSource::new());
            let engine = GovernanceEngine::new(store.clone(), EngineConfig::default()).with_clock(clock.clone());
            let reconciler = AuditReconciler::new(store, chain.clone());

            let proposal = engine
                .create_proposal(NewProposal::new("p", "alice", "1"))
                .await
                .unwrap()
                .record;
            for (i, offset) in vote_offsets.iter().enumerate() {
                clock.set(start + Duration::seconds(*offset));
                engine
                    .submit_vote(VoteRequest::new(&proposal.id, &format!("v{}", i), VoteChoice::For, "1"))
                    .await
                    .unwrap();
            }
            for (i, offset) in event_offsets.iter().enumerate() {
                chain.push(OnChainEvent::new(
                    &format!("tx-{}", i),
                    &proposal.id,
                    "relayer",
                    "vote_cast",
                    start + Duration::seconds(*offset),
                ));
            }
            chain.set_available(chain_up);

            let log = reconciler
                .get_audit_log(&AuditFilter::new(), Pagination::new(100, 0).unwrap())
                .await
                .unwrap();

            let off_chain = 1 + vote_offsets.len() as u64;
            let on_chain = if chain_up { event_offsets.len() as u64 } else { 0 };
            assert_eq!(log.total, off_chain + on_chain);
            assert_eq!(log.on_chain_count, on_chain);
            assert_eq!(log.entries.len() as u64, log.total);
            assert!(log.entries.windows(2).all(|w| w[0].timestamp() >= w[1].timestamp()));
            assert!(log.entries.iter().all(|e| e.proposal_id() == &proposal.id));
        });
    }
}
