//! Unsigned transaction payloads.
//!
//! Proposal creation and vote casting produce an unsigned payload for
//! external signing and submission. The engine treats the payload as opaque.

use crate::core::{ProposalId, Result, Timestamp};
use crate::decimal::Decimal;
use crate::governance::VoteChoice;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Intent to be expressed as a ledger transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum TransactionIntent {
    CreateProposal {
        proposal_id: ProposalId,
        proposer_id: String,
        quorum: Decimal,
        deadline: Option<Timestamp>,
        contract_ref: Option<String>,
    },
    CastVote {
        proposal_id: ProposalId,
        voter_id: String,
        choice: VoteChoice,
        weight: Decimal,
    },
}

/// Opaque unsigned transaction, returned alongside the created record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction(pub String);

impl UnsignedTransaction {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Builds unsigned transactions from intents.
pub trait TransactionBuilder: Send + Sync {
    fn build(&self, intent: &TransactionIntent) -> Result<UnsignedTransaction>;
}

/// Wraps the intent in a base64 JSON envelope bound to a network passphrase.
///
/// Stands in for a ledger-native encoder; the signer decodes the envelope.
#[derive(Clone, Debug)]
pub struct EnvelopeBuilder {
    network_passphrase: String,
}

#[derive(Serialize)]
struct Envelope<'a> {
    network: &'a str,
    #[serde(flatten)]
    intent: &'a TransactionIntent,
}

impl EnvelopeBuilder {
    pub fn new(network_passphrase: &str) -> Self {
        Self {
            network_passphrase: network_passphrase.to_string(),
        }
    }
}

impl TransactionBuilder for EnvelopeBuilder {
    fn build(&self, intent: &TransactionIntent) -> Result<UnsignedTransaction> {
        let envelope = Envelope {
            network: &self.network_passphrase,
            intent,
        };
        let json = serde_json::to_vec(&envelope)?;
        Ok(UnsignedTransaction(STANDARD.encode(json)))
    }
}
