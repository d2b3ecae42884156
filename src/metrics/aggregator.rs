//! Protocol-health metrics derived from the store.
//!
//! Read-only. Each snapshot comes from one consistent store read, so its
//! counts always agree with each other. Two snapshots taken during
//! concurrent writes may still differ.

use crate::core::{Clock, Result, Timestamp};
use crate::decimal::Decimal;
use crate::governance::ProposalStatus;
use crate::store::ProposalStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Point-in-time governance statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GovernanceMetrics {
    pub proposals_by_status: BTreeMap<ProposalStatus, u64>,
    pub total_proposals: u64,
    pub total_votes: u64,
    /// Mean vote weight, rounded half-up
    pub average_vote_weight: Decimal,
    /// Votes per proposal, rounded half-up; zero without proposals
    pub participation_rate: Decimal,
    pub taken_at: Timestamp,
}

impl GovernanceMetrics {
    /// Export in Prometheus text format.
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "# HELP governance_proposals Proposals by status");
        let _ = writeln!(output, "# TYPE governance_proposals gauge");
        for (status, count) in &self.proposals_by_status {
            let _ = writeln!(output, "governance_proposals{{status=\"{}\"}} {}", status, count);
        }

        let _ = writeln!(output, "# HELP governance_votes_total Accepted votes");
        let _ = writeln!(output, "# TYPE governance_votes_total counter");
        let _ = writeln!(output, "governance_votes_total {}", self.total_votes);

        let _ = writeln!(output, "# HELP governance_average_vote_weight Mean vote weight");
        let _ = writeln!(output, "# TYPE governance_average_vote_weight gauge");
        let _ = writeln!(output, "governance_average_vote_weight {}", self.average_vote_weight);

        let _ = writeln!(output, "# HELP governance_participation_rate Votes per proposal");
        let _ = writeln!(output, "# TYPE governance_participation_rate gauge");
        let _ = writeln!(output, "governance_participation_rate {}", self.participation_rate);

        output
    }
}

/// Computes [`GovernanceMetrics`] snapshots.
#[derive(Clone)]
pub struct MetricsAggregator {
    store: Arc<dyn ProposalStore>,
    clock: Arc<dyn Clock>,
    digits: u32,
}

impl MetricsAggregator {
    /// `digits` is the number of fractional digits for averages and ratios.
    pub fn new(store: Arc<dyn ProposalStore>, clock: Arc<dyn Clock>, digits: u32) -> Self {
        Self { store, clock, digits }
    }

    pub async fn snapshot(&self) -> Result<GovernanceMetrics> {
        let counts = self.store.governance_counts().await?;

        Ok(GovernanceMetrics {
            average_vote_weight: Decimal::average(counts.total_weight, counts.total_votes, self.digits),
            participation_rate: Decimal::ratio(counts.total_votes, counts.total_proposals, self.digits),
            proposals_by_status: counts.proposals_by_status,
            total_proposals: counts.total_proposals,
            total_votes: counts.total_votes,
            taken_at: self.clock.now(),
        })
    }
}
