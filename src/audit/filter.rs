//! Query filters for the audit log.

use crate::audit::entry::AuditEntry;
use crate::core::{Error, ProposalId, Result, Timestamp};
use crate::store::filter::ensure_known_keys;
use crate::store::Pagination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Filter for querying the reconciled audit log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Filter by proposal
    pub proposal_id: Option<ProposalId>,
    /// Filter by actor (proposer, voter, signer or confirmer)
    pub actor: Option<String>,
    /// Only entries at or after this instant
    pub since: Option<Timestamp>,
}

impl AuditFilter {
    const FIELDS: [&'static str; 5] = ["proposal_id", "actor", "since", "limit", "offset"];

    /// Create a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by proposal.
    pub fn by_proposal(mut self, proposal_id: &ProposalId) -> Self {
        self.proposal_id = Some(proposal_id.clone());
        self
    }

    /// Filter by actor.
    pub fn by_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    /// Only entries at or after `since`.
    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    /// Build the filter and its page window from request parameters.
    ///
    /// `since` is an RFC 3339 timestamp. Unknown keys are rejected.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<(Self, Pagination)> {
        ensure_known_keys(params, &Self::FIELDS)?;

        let proposal_id = non_empty(params, "proposal_id")?.map(|id| ProposalId::new(&id));
        let actor = non_empty(params, "actor")?;
        let since = params
            .get("since")
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw.trim())
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|_| Error::InvalidFilter(format!("since must be an RFC 3339 timestamp, got '{}'", raw)))
            })
            .transpose()?;
        let page = Pagination::from_values(
            params.get("limit").map(String::as_str),
            params.get("offset").map(String::as_str),
        )?;

        Ok((
            Self {
                proposal_id,
                actor,
                since,
            },
            page,
        ))
    }

    /// Check if an entry matches this filter.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(proposal_id) = &self.proposal_id {
            if entry.proposal_id() != proposal_id {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if entry.actor() != actor {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp() < since {
                return false;
            }
        }
        true
    }
}

fn non_empty(params: &BTreeMap<String, String>, key: &str) -> Result<Option<String>> {
    match params.get(key) {
        Some(v) if v.trim().is_empty() => Err(Error::InvalidFilter(format!("{} must not be empty", key))),
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}
