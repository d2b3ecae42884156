//! Audit Log
//!
//! Reconciled view over two event streams:
//! - Actions recorded by this engine (store)
//! - Events confirmed on the ledger (on-chain source)

pub mod entry;
pub mod filter;
pub mod reconciler;

pub use entry::{ActionKind, AuditEntry, OffChainAction};
pub use filter::AuditFilter;
pub use reconciler::{AuditLog, AuditReconciler, SourceStatus};
