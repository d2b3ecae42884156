//! Governance engine orchestrating proposal creation, vote acceptance and
//! resolution.
//!
//! The engine is a thin, cloneable facade over an injected store handle; it
//! keeps no proposal or vote state of its own.

use crate::chain::{EnvelopeBuilder, TransactionBuilder, TransactionIntent, UnsignedTransaction};
use crate::core::{Clock, Error, ProposalId, Result, SystemClock};
use crate::governance::acceptance::VoteAcceptor;
use crate::governance::config::EngineConfig;
use crate::governance::proposal::{NewProposal, Proposal};
use crate::governance::resolution::Resolver;
use crate::governance::tally::{ResolutionOutcome, Tally};
use crate::governance::vote::{Vote, VoteRequest};
use crate::metrics::MetricsAggregator;
use crate::store::{Page, Pagination, ProposalFilter, ProposalStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A created record plus the unsigned transaction for the ledger, if any.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submitted<T> {
    pub record: T,
    pub transaction: Option<UnsignedTransaction>,
}

/// Governance engine.
#[derive(Clone)]
pub struct GovernanceEngine {
    store: Arc<dyn ProposalStore>,
    clock: Arc<dyn Clock>,
    tx_builder: Option<Arc<dyn TransactionBuilder>>,
    acceptor: VoteAcceptor,
    resolver: Resolver,
    config: EngineConfig,
}

impl GovernanceEngine {
    /// Create an engine over an opened store.
    ///
    /// When the config names a network passphrase, unsigned transactions are
    /// produced with an [`EnvelopeBuilder`].
    pub fn new(store: Arc<dyn ProposalStore>, config: EngineConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tx_builder = config
            .network_passphrase
            .as_deref()
            .map(|passphrase| Arc::new(EnvelopeBuilder::new(passphrase)) as Arc<dyn TransactionBuilder>);

        Self {
            acceptor: VoteAcceptor::new(store.clone(), clock.clone()),
            resolver: Resolver::new(store.clone(), clock.clone()),
            store,
            clock,
            tx_builder,
            config,
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.acceptor = VoteAcceptor::new(self.store.clone(), clock.clone());
        self.resolver = Resolver::new(self.store.clone(), clock.clone());
        self.clock = clock;
        self
    }

    /// Replace the transaction builder.
    pub fn with_transaction_builder(mut self, builder: Arc<dyn TransactionBuilder>) -> Self {
        self.tx_builder = Some(builder);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ProposalStore> {
        &self.store
    }

    /// Create a new OPEN proposal.
    pub async fn create_proposal(&self, request: NewProposal) -> Result<Submitted<Proposal>> {
        let draft = request.into_draft(self.clock.now())?;
        let proposal = self.store.insert_proposal(draft).await?;
        info!(
            proposal_id = %proposal.id,
            proposer_id = %proposal.proposer_id,
            quorum = %proposal.quorum,
            "proposal created"
        );

        let transaction = self.build_transaction(&TransactionIntent::CreateProposal {
            proposal_id: proposal.id.clone(),
            proposer_id: proposal.proposer_id.clone(),
            quorum: proposal.quorum,
            deadline: proposal.deadline,
            contract_ref: proposal.contract_ref.clone(),
        });

        Ok(Submitted {
            record: proposal,
            transaction,
        })
    }

    /// Accept a vote.
    ///
    /// A retried identical request resolves to `DuplicateVote`, never a
    /// second vote.
    pub async fn submit_vote(&self, request: VoteRequest) -> Result<Submitted<Vote>> {
        let vote = self.acceptor.accept(request).await?;

        if self.config.evaluate_on_vote {
            // The vote is already durable; a failed evaluation is picked up
            // by the next evaluate call or sweep.
            if let Err(e) = self.resolver.evaluate(&vote.proposal_id).await {
                warn!(proposal_id = %vote.proposal_id, error = %e, "post-vote evaluation failed");
            }
        }

        let transaction = self.build_transaction(&TransactionIntent::CastVote {
            proposal_id: vote.proposal_id.clone(),
            voter_id: vote.voter_id.clone(),
            choice: vote.choice,
            weight: vote.weight,
        });

        Ok(Submitted {
            record: vote,
            transaction,
        })
    }

    /// Evaluate and, if due, resolve a proposal. Idempotent.
    pub async fn evaluate(&self, proposal_id: &ProposalId) -> Result<ResolutionOutcome> {
        self.resolver.evaluate(proposal_id).await
    }

    /// Evaluate every OPEN proposal past its deadline.
    pub async fn evaluate_expired(&self) -> Result<Vec<ResolutionOutcome>> {
        self.resolver.evaluate_expired().await
    }

    /// Record external execution of a PASSED proposal.
    pub async fn confirm_execution(&self, proposal_id: &ProposalId, confirmed_by: &str) -> Result<Proposal> {
        self.resolver.confirm_execution(proposal_id, confirmed_by).await
    }

    /// Read a proposal, resolving it first if its deadline has passed, so a
    /// final status is never served stale.
    pub async fn get_proposal(&self, proposal_id: &ProposalId) -> Result<Proposal> {
        let proposal = self
            .store
            .find_proposal(proposal_id)
            .await?
            .ok_or_else(|| Error::ProposalNotFound(proposal_id.clone()))?;

        if proposal.is_open() && proposal.deadline_passed(self.clock.now()) {
            let outcome = self.resolver.evaluate(proposal_id).await?;
            return Ok(Proposal {
                status: outcome.status,
                ..proposal
            });
        }
        Ok(proposal)
    }

    /// List proposals.
    pub async fn list_proposals(&self, filter: &ProposalFilter) -> Result<Page<Proposal>> {
        let page = filter.page.unwrap_or_default();
        let filter = filter.clone().with_page(page);
        let (items, total) = self.store.list_proposals(&filter).await?;
        Ok(Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// List a proposal's votes in acceptance order.
    pub async fn list_votes(&self, proposal_id: &ProposalId, page: Pagination) -> Result<Page<Vote>> {
        if self.store.find_proposal(proposal_id).await?.is_none() {
            return Err(Error::ProposalNotFound(proposal_id.clone()));
        }
        let (items, total) = self
            .store
            .list_votes(proposal_id, page.limit, page.offset)
            .await?;
        Ok(Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// Current tally, read-only.
    pub async fn tally(&self, proposal_id: &ProposalId) -> Result<Tally> {
        if self.store.find_proposal(proposal_id).await?.is_none() {
            return Err(Error::ProposalNotFound(proposal_id.clone()));
        }
        self.resolver.current_tally(proposal_id).await
    }

    /// Metrics aggregator over this engine's store.
    pub fn metrics(&self) -> MetricsAggregator {
        MetricsAggregator::new(self.store.clone(), self.clock.clone(), self.config.average_digits)
    }

    fn build_transaction(&self, intent: &TransactionIntent) -> Option<UnsignedTransaction> {
        let builder = self.tx_builder.as_ref()?;
        match builder.build(intent) {
            Ok(tx) => Some(tx),
            Err(e) => {
                warn!(error = %e, "unsigned transaction could not be built");
                None
            }
        }
    }
}
