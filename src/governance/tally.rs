//! Weighted tally and the resolution decision rule.
//!
//! Abstain weight counts toward participation (and therefore quorum) but is
//! excluded from the for/against comparison. A tie resolves to REJECTED.

use crate::core::{Error, ProposalId, Result};
use crate::decimal::Decimal;
use crate::governance::proposal::ProposalStatus;
use crate::governance::vote::{Vote, VoteChoice};
use serde::{Deserialize, Serialize};

/// Aggregate weights for one proposal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub for_weight: Decimal,
    pub against_weight: Decimal,
    pub abstain_weight: Decimal,
    /// Sum of all recorded weights, abstain included
    pub total_weight: Decimal,
    pub vote_count: u64,
}

impl Tally {
    /// Sum a set of votes. Order-independent.
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Result<Self> {
        let mut tally = Tally::default();
        for vote in votes {
            tally.add(vote.choice, vote.weight)?;
        }
        Ok(tally)
    }

    /// Record one vote's weight.
    ///
    /// The tally is left unchanged if any aggregate would overflow.
    pub fn add(&mut self, choice: VoteChoice, weight: Decimal) -> Result<()> {
        let overflow = || Error::Internal(format!("tally overflow adding weight {}", weight));
        let total_weight = self.total_weight.checked_add(weight).ok_or_else(overflow)?;
        let slot = match choice {
            VoteChoice::For => &mut self.for_weight,
            VoteChoice::Against => &mut self.against_weight,
            VoteChoice::Abstain => &mut self.abstain_weight,
        };
        // Each per-choice weight is bounded by the total.
        *slot = slot.checked_add(weight).ok_or_else(overflow)?;
        self.total_weight = total_weight;
        self.vote_count += 1;
        Ok(())
    }

    pub fn quorum_met(&self, quorum: Decimal) -> bool {
        self.total_weight >= quorum
    }

    /// Apply the decision rule.
    ///
    /// Returns `None` while the voting window is open: a proposal is never
    /// resolved early on quorum alone.
    pub fn decide(&self, quorum: Decimal, deadline_passed: bool) -> Option<ProposalStatus> {
        if !deadline_passed {
            return None;
        }
        if !self.quorum_met(quorum) {
            return Some(ProposalStatus::Rejected);
        }
        if self.for_weight > self.against_weight {
            Some(ProposalStatus::Passed)
        } else {
            Some(ProposalStatus::Rejected)
        }
    }
}

/// Result of evaluating a proposal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub proposal_id: ProposalId,
    /// Status after evaluation
    pub status: ProposalStatus,
    /// Status observed before evaluation
    pub previous_status: ProposalStatus,
    pub tally: Tally,
    pub quorum: Decimal,
    pub quorum_met: bool,
    /// Whether this evaluation performed the status change
    pub transitioned: bool,
}

impl ResolutionOutcome {
    pub fn is_final(&self) -> bool {
        self.status != ProposalStatus::Open
    }
}
