//! Ledger Collaborators
//!
//! Interfaces to the external ledger:
//! - On-chain event observation
//! - Unsigned transaction building

pub mod source;
pub mod transaction;

pub use source::{MemoryEventSource, OnChainEvent, OnChainSource};
pub use transaction::{EnvelopeBuilder, TransactionBuilder, TransactionIntent, UnsignedTransaction};
