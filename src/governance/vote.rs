//! Votes cast against proposals.

use crate::core::{Error, ProposalId, Result, Timestamp, VoteId};
use crate::decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Direction of a vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    /// Support the proposal
    For,
    /// Oppose the proposal
    Against,
    /// Participate without taking a side
    Abstain,
}

impl VoteChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteChoice::For => "for",
            VoteChoice::Against => "against",
            VoteChoice::Abstain => "abstain",
        }
    }
}

impl std::fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "for" | "yes" => Ok(VoteChoice::For),
            "against" | "no" => Ok(VoteChoice::Against),
            "abstain" => Ok(VoteChoice::Abstain),
            other => Err(Error::InvalidVote(format!("unknown vote choice '{}'", other))),
        }
    }
}

impl From<bool> for VoteChoice {
    fn from(support: bool) -> Self {
        if support {
            VoteChoice::For
        } else {
            VoteChoice::Against
        }
    }
}

/// An accepted vote. Immutable once persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    /// Store-assigned identifier
    pub id: VoteId,
    pub proposal_id: ProposalId,
    pub voter_id: String,
    pub choice: VoteChoice,
    pub weight: Decimal,
    pub cast_at: Timestamp,
    /// Store insertion order, unique per store
    pub sequence: u64,
}

/// Caller-supplied vote request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteRequest {
    pub proposal_id: ProposalId,
    pub voter_id: String,
    pub choice: VoteChoice,
    /// Decimal string, parsed and validated at acceptance time
    pub weight: String,
}

impl VoteRequest {
    pub fn new(proposal_id: &ProposalId, voter_id: &str, choice: VoteChoice, weight: &str) -> Self {
        Self {
            proposal_id: proposal_id.clone(),
            voter_id: voter_id.to_string(),
            choice,
            weight: weight.to_string(),
        }
    }
}

/// A validated vote awaiting conditional insertion.
#[derive(Clone, Debug, PartialEq)]
pub struct VoteDraft {
    pub proposal_id: ProposalId,
    pub voter_id: String,
    pub choice: VoteChoice,
    pub weight: Decimal,
    pub cast_at: Timestamp,
}

impl VoteDraft {
    /// Materialize with store-assigned identity.
    pub fn into_vote(self, id: VoteId, sequence: u64) -> Vote {
        Vote {
            id,
            proposal_id: self.proposal_id,
            voter_id: self.voter_id,
            choice: self.choice,
            weight: self.weight,
            cast_at: self.cast_at,
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_parse() {
        assert_eq!("FOR".parse::<VoteChoice>().unwrap(), VoteChoice::For);
        assert_eq!("no".parse::<VoteChoice>().unwrap(), VoteChoice::Against);
        assert_eq!("abstain".parse::<VoteChoice>().unwrap(), VoteChoice::Abstain);
        assert!(matches!("maybe".parse::<VoteChoice>(), Err(Error::InvalidVote(ref msg)) if msg.contains("maybe")));
    }

    #[test]
    fn test_choice_from_bool() {
        assert_eq!(VoteChoice::from(true), VoteChoice::For);
        assert_eq!(VoteChoice::from(false), VoteChoice::Against);
    }

    #[test]
    fn test_choice_serde() {
        assert_eq!(serde_json::to_string(&VoteChoice::Against).unwrap(), "\"against\"");
    }

    #[test]
    fn test_draft_into_vote() {
        let draft = VoteDraft {
            proposal_id: ProposalId::new("p"),
            voter_id: "bob".to_string(),
            choice: VoteChoice::For,
            weight: Decimal::from_units(3),
            cast_at: crate::core::now(),
        };
        let vote = draft.clone().into_vote(VoteId::new("v-1"), 7);
        assert_eq!(vote.voter_id, "bob");
        assert_eq!(vote.sequence, 7);
        assert_eq!(vote.weight, draft.weight);
    }
}
