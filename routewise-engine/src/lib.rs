//! ROUTEWISE Engine - Assignment Decisions
//!
//! Turns a ticket and a snapshot of the agent pool into a routing decision:
//! - Age-decayed workload weighting
//! - Eligibility filtering with reason codes
//! - Multi-factor match scoring
//! - Deterministic ranking with near-tie handling
//! - Threshold application, staleness downgrade, and manual overrides

pub mod eligibility;
pub mod orchestrator;
pub mod ranking;
pub mod scoring;
pub mod workload;

pub use eligibility::{check_agent, filter_eligible, Eligibility};
pub use orchestrator::{evaluate, DecisionEngine};
pub use ranking::rank_candidates;
pub use scoring::{score_agent, score_candidates};
pub use workload::{compute_weighted_load, weigh_ticket_ages, AgeBucket};
