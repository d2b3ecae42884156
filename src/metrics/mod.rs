//! Governance metrics
//!
//! Read-side statistics with Prometheus text export.

pub mod aggregator;

pub use aggregator::{GovernanceMetrics, MetricsAggregator};
