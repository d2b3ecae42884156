//! Proposal Store
//!
//! Durable record of proposals and votes:
//! - `ProposalStore` trait with conditional-insert and compare-and-set
//! - Explicit proposal/vote filters and pagination
//! - In-memory backend

pub mod backend;
pub mod config;
pub mod factory;
pub mod filter;
pub mod memory;

pub use backend::{
    BackendType, GovernanceCounts, ProposalStore, StatusChange, StatusUpdate, VoteInsert,
    VoteRejection,
};
pub use config::StoreConfig;
pub use factory::open_store;
pub use filter::{Page, Pagination, ProposalFilter, VoteFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use memory::MemoryStore;
