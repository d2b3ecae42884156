//! Query filters and pagination for store reads.
//!
//! Filters are explicit structures. Parsing from loose key/value parameters
//! rejects unrecognized keys instead of ignoring them.

use crate::core::{Error, ProposalId, Result};
use crate::governance::{Proposal, ProposalStatus, Vote, VoteChoice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Limit/offset window over an ordered sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    /// Create a validated window. A zero limit is rejected; limits above
    /// [`MAX_PAGE_SIZE`] are capped.
    pub fn new(limit: usize, offset: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidFilter("limit must be at least 1".to_string()));
        }
        Ok(Self {
            limit: limit.min(MAX_PAGE_SIZE),
            offset,
        })
    }

    /// Parse `limit`/`offset` values, falling back to defaults when absent.
    pub fn from_values(limit: Option<&str>, offset: Option<&str>) -> Result<Self> {
        let limit = match limit {
            Some(raw) => parse_usize("limit", raw)?,
            None => DEFAULT_PAGE_SIZE,
        };
        let offset = match offset {
            Some(raw) => parse_usize("offset", raw)?,
            None => 0,
        };
        Self::new(limit, offset)
    }

    /// Slice an already-ordered sequence.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// A page of results plus the unpaginated total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

fn parse_usize(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidFilter(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

/// Reject any key outside `allowed`.
pub(crate) fn ensure_known_keys(params: &BTreeMap<String, String>, allowed: &[&str]) -> Result<()> {
    if let Some(unknown) = params.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(Error::InvalidFilter(format!(
            "unrecognized field '{}' (expected one of: {})",
            unknown,
            allowed.join(", ")
        )));
    }
    Ok(())
}

/// Filter for listing and counting proposals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalFilter {
    pub status: Option<ProposalStatus>,
    pub proposer_id: Option<String>,
    /// `None` returns every match
    pub page: Option<Pagination>,
}

impl ProposalFilter {
    const FIELDS: [&'static str; 4] = ["status", "proposer_id", "limit", "offset"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_status(mut self, status: ProposalStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn by_proposer(mut self, proposer_id: &str) -> Self {
        self.proposer_id = Some(proposer_id.to_string());
        self
    }

    pub fn with_page(mut self, page: Pagination) -> Self {
        self.page = Some(page);
        self
    }

    /// Build from request parameters. Pagination always applies, with
    /// defaults when `limit`/`offset` are absent.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self> {
        ensure_known_keys(params, &Self::FIELDS)?;

        let status = params
            .get("status")
            .map(|s| s.parse::<ProposalStatus>())
            .transpose()?;
        let proposer_id = match params.get("proposer_id") {
            Some(p) if p.trim().is_empty() => {
                return Err(Error::InvalidFilter("proposer_id must not be empty".to_string()))
            }
            Some(p) => Some(p.trim().to_string()),
            None => None,
        };
        let page = Pagination::from_values(
            params.get("limit").map(String::as_str),
            params.get("offset").map(String::as_str),
        )?;

        Ok(Self {
            status,
            proposer_id,
            page: Some(page),
        })
    }

    /// Same criteria without pagination, for counting.
    pub fn unpaged(&self) -> Self {
        Self {
            page: None,
            ..self.clone()
        }
    }

    pub fn matches(&self, proposal: &Proposal) -> bool {
        if let Some(status) = self.status {
            if proposal.status != status {
                return false;
            }
        }
        if let Some(proposer) = &self.proposer_id {
            if &proposal.proposer_id != proposer {
                return false;
            }
        }
        true
    }
}

/// Filter for reading and counting votes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteFilter {
    pub proposal_id: Option<ProposalId>,
    pub voter_id: Option<String>,
    pub choice: Option<VoteChoice>,
}

impl VoteFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All votes on one proposal.
    pub fn for_proposal(proposal_id: &ProposalId) -> Self {
        Self {
            proposal_id: Some(proposal_id.clone()),
            ..Self::default()
        }
    }

    pub fn by_voter(mut self, voter_id: &str) -> Self {
        self.voter_id = Some(voter_id.to_string());
        self
    }

    pub fn by_choice(mut self, choice: VoteChoice) -> Self {
        self.choice = Some(choice);
        self
    }

    pub fn matches(&self, vote: &Vote) -> bool {
        if let Some(proposal_id) = &self.proposal_id {
            if &vote.proposal_id != proposal_id {
                return false;
            }
        }
        if let Some(voter) = &self.voter_id {
            if &vote.voter_id != voter {
                return false;
            }
        }
        if let Some(choice) = self.choice {
            if vote.choice != choice {
                return false;
            }
        }
        true
    }
}
