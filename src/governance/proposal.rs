//! Governance proposals and their lifecycle.

use crate::core::{Error, ProposalId, Result, Timestamp};
use crate::decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of a proposal.
///
/// Transitions are monotonic: OPEN -> {PASSED, REJECTED}, PASSED -> EXECUTED.
/// REJECTED and EXECUTED are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProposalStatus {
    /// Accepting votes
    Open,
    /// Resolved in favour, awaiting execution
    Passed,
    /// Resolved against, or quorum not reached
    Rejected,
    /// Execution confirmed externally
    Executed,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 4] = [
        ProposalStatus::Open,
        ProposalStatus::Passed,
        ProposalStatus::Rejected,
        ProposalStatus::Executed,
    ];

    /// Whether `self -> next` is a legal lifecycle step.
    pub fn can_transition_to(self, next: ProposalStatus) -> bool {
        matches!(
            (self, next),
            (ProposalStatus::Open, ProposalStatus::Passed)
                | (ProposalStatus::Open, ProposalStatus::Rejected)
                | (ProposalStatus::Passed, ProposalStatus::Executed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProposalStatus::Rejected | ProposalStatus::Executed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProposalStatus::Open => "OPEN",
            ProposalStatus::Passed => "PASSED",
            ProposalStatus::Rejected => "REJECTED",
            ProposalStatus::Executed => "EXECUTED",
        }
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(ProposalStatus::Open),
            "PASSED" => Ok(ProposalStatus::Passed),
            "REJECTED" => Ok(ProposalStatus::Rejected),
            "EXECUTED" => Ok(ProposalStatus::Executed),
            other => Err(Error::InvalidFilter(format!("unknown status '{}'", other))),
        }
    }
}

/// A persisted governance proposal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Store-assigned identifier
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    /// Proposer identity
    pub proposer_id: String,
    /// Minimum participating weight required to resolve
    pub quorum: Decimal,
    pub created_at: Timestamp,
    /// Voting closes after this instant (inclusive)
    pub deadline: Option<Timestamp>,
    pub status: ProposalStatus,
    /// On-chain contract/action reference
    pub contract_ref: Option<String>,
}

impl Proposal {
    /// Whether the voting window has closed at `now`.
    ///
    /// Votes are accepted while `now <= deadline`. Proposals without a
    /// deadline never close by time.
    pub fn deadline_passed(&self, now: Timestamp) -> bool {
        self.deadline.map_or(false, |deadline| now > deadline)
    }

    pub fn is_open(&self) -> bool {
        self.status == ProposalStatus::Open
    }
}

/// Caller-supplied proposal creation request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewProposal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub proposer_id: String,
    /// Decimal string, must be greater than zero
    pub quorum: String,
    #[serde(default)]
    pub deadline: Option<Timestamp>,
    #[serde(default)]
    pub contract_ref: Option<String>,
}

impl NewProposal {
    /// Create a request with the required fields.
    pub fn new(title: &str, proposer_id: &str, quorum: &str) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            proposer_id: proposer_id.to_string(),
            quorum: quorum.to_string(),
            deadline: None,
            contract_ref: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_deadline(mut self, deadline: Timestamp) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_contract_ref(mut self, contract_ref: &str) -> Self {
        self.contract_ref = Some(contract_ref.to_string());
        self
    }

    /// Validate the request and produce a draft stamped with `created_at`.
    pub fn into_draft(self, created_at: Timestamp) -> Result<ProposalDraft> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidProposal("title must not be empty".to_string()));
        }
        if self.proposer_id.trim().is_empty() {
            return Err(Error::InvalidProposal("proposer_id must not be empty".to_string()));
        }
        let quorum = Decimal::parse_positive(&self.quorum)?;
        if let Some(deadline) = self.deadline {
            if deadline <= created_at {
                return Err(Error::InvalidProposal(format!(
                    "deadline {} must be after creation time {}",
                    deadline, created_at
                )));
            }
        }

        Ok(ProposalDraft {
            title: self.title,
            description: self.description,
            proposer_id: self.proposer_id,
            quorum,
            created_at,
            deadline: self.deadline,
            contract_ref: self.contract_ref,
        })
    }
}

/// A validated proposal awaiting an identifier from the store.
#[derive(Clone, Debug, PartialEq)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub proposer_id: String,
    pub quorum: Decimal,
    pub created_at: Timestamp,
    pub deadline: Option<Timestamp>,
    pub contract_ref: Option<String>,
}

impl ProposalDraft {
    /// Materialize as an OPEN proposal with the given identifier.
    pub fn into_proposal(self, id: ProposalId) -> Proposal {
        Proposal {
            id,
            title: self.title,
            description: self.description,
            proposer_id: self.proposer_id,
            quorum: self.quorum,
            created_at: self.created_at,
            deadline: self.deadline,
            status: ProposalStatus::Open,
            contract_ref: self.contract_ref,
        }
    }
}

/// A recorded status change, kept for the audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub proposal_id: ProposalId,
    pub from: ProposalStatus,
    pub to: ProposalStatus,
    pub at: Timestamp,
    /// Who performed the change (the engine, or an execution confirmer)
    pub actor: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::now;
    use chrono::Duration;

    #[test]
    fn test_legal_transitions() {
        use ProposalStatus::*;
        assert!(Open.can_transition_to(Passed));
        assert!(Open.can_transition_to(Rejected));
        assert!(Passed.can_transition_to(Executed));
    }

    #[test]
    fn test_illegal_transitions() {
        use ProposalStatus::*;
        for from in ProposalStatus::ALL {
            assert!(!from.can_transition_to(Open), "{} -> OPEN", from);
            assert!(!from.can_transition_to(from), "{} -> itself", from);
        }
        assert!(!Open.can_transition_to(Executed));
        assert!(!Rejected.can_transition_to(Passed));
        assert!(!Rejected.can_transition_to(Executed));
        assert!(!Executed.can_transition_to(Passed));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ProposalStatus::Rejected.is_terminal());
        assert!(ProposalStatus::Executed.is_terminal());
        assert!(!ProposalStatus::Open.is_terminal());
        assert!(!ProposalStatus::Passed.is_terminal());
    }

    #[test]
    fn test_status_parse_and_serde() {
        assert_eq!("passed".parse::<ProposalStatus>().unwrap(), ProposalStatus::Passed);
        assert!(matches!("closed".parse::<ProposalStatus>(), Err(Error::InvalidFilter(_))));
        assert_eq!(serde_json::to_string(&ProposalStatus::Open).unwrap(), "\"OPEN\"");
    }

    #[test]
    fn test_into_draft_validates() {
        let created = now();

        let draft = NewProposal::new("Raise cap", "alice", "100")
            .with_deadline(created + Duration::hours(1))
            .into_draft(created)
            .unwrap();
        assert_eq!(draft.quorum, Decimal::from_units(100));

        let empty_title = NewProposal::new("  ", "alice", "100").into_draft(created);
        assert!(matches!(empty_title, Err(Error::InvalidProposal(_))));

        let zero_quorum = NewProposal::new("t", "alice", "0").into_draft(created);
        assert!(matches!(zero_quorum, Err(Error::InvalidWeight(_))));

        let past_deadline = NewProposal::new("t", "alice", "1")
            .with_deadline(created)
            .into_draft(created);
        assert!(matches!(past_deadline, Err(Error::InvalidProposal(_))));
    }

    #[test]
    fn test_deadline_passed_is_exclusive() {
        let created = now();
        let deadline = created + Duration::hours(1);
        let proposal = NewProposal::new("t", "alice", "1")
            .with_deadline(deadline)
            .into_draft(created)
            .unwrap()
            .into_proposal(ProposalId::new("p"));

        assert!(!proposal.deadline_passed(deadline));
        assert!(proposal.deadline_passed(deadline + Duration::milliseconds(1)));
        assert!(proposal.is_open());
    }

    #[test]
    fn test_no_deadline_never_passes() {
        let proposal = NewProposal::new("t", "alice", "1")
            .into_draft(now())
            .unwrap()
            .into_proposal(ProposalId::new("p"));
        assert!(!proposal.deadline_passed(now() + Duration::days(3650)));
    }
}
