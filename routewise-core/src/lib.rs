//! ROUTEWISE Core - Entity Types and Shared State
//!
//! Data structures shared by every ROUTEWISE crate:
//! - Agents, tickets, and their identifiers
//! - Decision records and score breakdowns
//! - Engine configuration with validation and hot reload
//! - Agent pool snapshots published by the sync client
//! - Collaborator traits and the error taxonomy
//!
//! This crate contains no scoring logic; see `routewise-engine`.

mod clock;
mod config;
mod config_store;
pub mod constants;
mod decision;
mod entities;
mod error;
mod identity;
mod snapshot;
mod traits;

pub use clock::{Clock, Sleeper, SystemClock};
pub use config::{
    CapacityCeiling, DecayConfig, EngineConfig, LevelScoring, LocationScoring, RetryConfig,
    ScoringWeights, Thresholds, VipScoring,
};
pub use config_store::ConfigStore;
pub use decision::{
    Decision, DecisionOutcome, DecisionType, LoadBreakdown, RankedCandidate, Rejection,
    RejectionReason, ScoreBreakdown, WeightedLoad,
};
pub use entities::{
    normalize_skill, Agent, Leave, LeaveStatus, Location, LocationRequirement, OpenTicket,
    SupportLevel, SupportMode, Ticket,
};
pub use error::{ConfigError, EngineError, RoutewiseError, RoutewiseResult, SyncError};
pub use identity::{new_decision_id, AgentId, DecisionId, TicketId, Timestamp};
pub use snapshot::{PoolSnapshot, SnapshotStore, SyncFailure};
pub use traits::{AgentDirectory, DecisionSink, TracingDecisionSink};
