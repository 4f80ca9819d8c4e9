//! ROUTEWISE Test Utilities
//!
//! Centralized test infrastructure for the ROUTEWISE workspace:
//! - Test doubles for the collaborator traits (directory, sink, clock, sleeper)
//! - Proptest generators for agents, tickets, and configs
//! - Fixtures for the common routing scenarios
//! - Custom assertions for ROUTEWISE error variants

// Re-export core types for convenience
pub use routewise_core::{
    Agent, AgentDirectory, AgentId, Clock, ConfigError, Decision, DecisionSink, EngineConfig,
    EngineError, Leave, Location, LocationRequirement, PoolSnapshot, RoutewiseError,
    RoutewiseResult, Sleeper, SupportLevel, SupportMode, SyncError, Ticket, TicketId, Timestamp,
};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// Decision sink that keeps every decision in memory.
#[derive(Debug, Default)]
pub struct MemoryDecisionSink {
    decisions: Mutex<Vec<Decision>>,
}

impl MemoryDecisionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decisions(&self) -> Vec<Decision> {
        self.decisions.lock().clone()
    }

    pub fn last(&self) -> Option<Decision> {
        self.decisions.lock().last().cloned()
    }
}

impl DecisionSink for MemoryDecisionSink {
    fn record(&self, decision: Decision) {
        self.decisions.lock().push(decision);
    }
}

/// Clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(Timestamp);

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn advance(&self, by: Duration) {
        let step = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        *self.now.lock() += step;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

/// Sleeper that returns immediately and records each requested delay.
///
/// When attached to a [`ManualClock`], every sleep also advances it.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
    clock: Option<Arc<ManualClock>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<ManualClock>) -> Self {
        Self {
            slept: Mutex::new(Vec::new()),
            clock: Some(clock),
        }
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }

    pub fn total(&self) -> Duration {
        self.slept.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
        if let Some(clock) = &self.clock {
            clock.advance(duration);
        }
    }
}

/// In-memory agent directory with a switchable failure mode.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    agents: RwLock<Vec<Agent>>,
    tickets: RwLock<HashMap<TicketId, Ticket>>,
    failure: RwLock<Option<RoutewiseError>>,
    agent_calls: Mutex<u32>,
}

impl InMemoryDirectory {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self {
            agents: RwLock::new(agents),
            ..Self::default()
        }
    }

    pub fn with_ticket(self, ticket: Ticket) -> Self {
        self.tickets.write().insert(ticket.ticket_id.clone(), ticket);
        self
    }

    pub fn set_agents(&self, agents: Vec<Agent>) {
        *self.agents.write() = agents;
    }

    /// Make every call fail with `error` until cleared with `None`.
    pub fn fail_with(&self, error: Option<RoutewiseError>) {
        *self.failure.write() = error;
    }

    pub fn agent_calls(&self) -> u32 {
        *self.agent_calls.lock()
    }
}

#[async_trait]
impl AgentDirectory for InMemoryDirectory {
    async fn list_available_agents(&self) -> RoutewiseResult<Vec<Agent>> {
        *self.agent_calls.lock() += 1;
        if let Some(error) = self.failure.read().clone() {
            return Err(error);
        }
        Ok(self.agents.read().clone())
    }

    async fn get_ticket(&self, ticket_id: &TicketId) -> RoutewiseResult<Ticket> {
        if let Some(error) = self.failure.read().clone() {
            return Err(error);
        }
        self.tickets
            .read()
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| {
                EngineError::TicketNotFound {
                    ticket_id: ticket_id.clone(),
                }
                .into()
            })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating ROUTEWISE entity types.

    use super::*;
    use proptest::prelude::*;

    const SKILLS: [&str; 8] = [
        "password_reset",
        "vpn",
        "mfa",
        "printer",
        "email",
        "sso",
        "hardware",
        "network",
    ];

    const CITIES: [(&str, &str); 4] = [
        ("Vancouver", "America/Vancouver"),
        ("Seattle", "America/Vancouver"),
        ("Toronto", "America/Toronto"),
        ("Berlin", "Europe/Berlin"),
    ];

    pub fn arb_level() -> impl Strategy<Value = SupportLevel> {
        prop_oneof![
            Just(SupportLevel::L1),
            Just(SupportLevel::L2),
            Just(SupportLevel::L3)
        ]
    }

    fn arb_support_mode() -> impl Strategy<Value = SupportMode> {
        prop_oneof![Just(SupportMode::Remote), Just(SupportMode::Onsite)]
    }

    pub fn arb_skills() -> impl Strategy<Value = Vec<&'static str>> {
        prop::sample::subsequence(SKILLS.to_vec(), 0..4)
    }

    pub fn arb_location() -> impl Strategy<Value = Location> {
        (
            prop::sample::select(CITIES.to_vec()),
            proptest::option::of(arb_support_mode()),
            any::<bool>(),
        )
            .prop_map(|((city, tz), mode, both)| {
                let modes = match (mode, both) {
                    (None, _) => vec![],
                    (Some(_), true) => vec![SupportMode::Remote, SupportMode::Onsite],
                    (Some(mode), false) => vec![mode],
                };
                Location::new(city, tz, modes)
            })
    }

    fn arb_location_requirement() -> impl Strategy<Value = LocationRequirement> {
        prop::sample::select(CITIES.to_vec()).prop_map(|(city, tz)| LocationRequirement::new(city, tz))
    }

    /// Ticket ages in days, spanning every decay bucket.
    pub fn arb_ticket_ages() -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(0u32..45, 0..15)
    }

    /// An agent with the given id and arbitrary everything else.
    pub fn arb_agent_with_id(agent_id: String) -> impl Strategy<Value = Agent> {
        (
            arb_level(),
            arb_skills(),
            proptest::option::of(arb_location()),
            arb_ticket_ages(),
            any::<bool>(),
            prop_oneof![Just(None), Just(Some(false)), Just(Some(true))],
        )
            .prop_map(move |(level, skills, location, ages, available, vip)| {
                let mut agent = Agent::new(agent_id.clone(), "Generated Agent", level)
                    .with_skills(&skills)
                    .with_availability(available)
                    .with_open_ticket_ages(&ages);
                agent.location = location;
                if let Some(specialist) = vip {
                    agent = agent.with_vip(specialist);
                }
                agent
            })
    }

    pub fn arb_agent() -> impl Strategy<Value = Agent> {
        "[a-z]{3,8}".prop_flat_map(arb_agent_with_id)
    }

    /// A pool of agents with unique ids (`agent-0`, `agent-1`, ...).
    pub fn arb_pool(max: usize) -> impl Strategy<Value = Vec<Agent>> {
        (0..=max).prop_flat_map(|size| {
            (0..size)
                .map(|i| arb_agent_with_id(format!("agent-{i}")))
                .collect::<Vec<_>>()
        })
    }

    pub fn arb_ticket() -> impl Strategy<Value = Ticket> {
        (
            arb_level(),
            arb_skills(),
            proptest::option::of(arb_location_requirement()),
            proptest::option::of(arb_support_mode()),
            any::<bool>(),
        )
            .prop_map(|(level, skills, location, mode, vip)| {
                let mut ticket = Ticket::new("generated-ticket", "Generated", level)
                    .with_required_skills(&skills);
                ticket.location = location;
                ticket.support_mode = mode;
                ticket.vip = vip;
                ticket
            })
    }

    /// A config that passes validation, already prepared.
    pub fn arb_engine_config() -> impl Strategy<Value = EngineConfig> {
        (
            prop::array::uniform5(0.0f64..1.0),
            0.5f64..0.95,
            0.1f64..0.5,
            0usize..5,
        )
            .prop_filter_map("weights must not all be zero", |(w, auto, suggest, alternatives)| {
                if w.iter().sum::<f64>() <= 0.01 {
                    return None;
                }
                let mut config = EngineConfig::default();
                config.weights.skill = w[0];
                config.weights.level = w[1];
                config.weights.workload = w[2];
                config.weights.location = w[3];
                config.weights.vip = w[4];
                config.thresholds.auto_assign = auto;
                config.thresholds.suggest = suggest;
                config.alternatives_count = alternatives;
                config.prepare().ok()
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common routing scenarios.

    use super::*;

    /// Default config, validated and normalized.
    pub fn default_config() -> EngineConfig {
        EngineConfig::default().normalized()
    }

    /// L1 password-reset ticket located in Vancouver.
    pub fn vancouver_ticket() -> Ticket {
        Ticket::new("T-1001", "Cannot log in after password change", SupportLevel::L1)
            .with_required_skills(&["password_reset"])
            .with_location(LocationRequirement::new("Vancouver", "America/Vancouver"))
    }

    /// Vancouver L1 agent with two fresh tickets (weighted load 4.0).
    pub fn alice() -> Agent {
        Agent::new("A", "Alice", SupportLevel::L1)
            .with_skills(&["password_reset"])
            .with_location(Location::new("Vancouver", "America/Vancouver", vec![SupportMode::Remote]))
            .with_open_ticket_ages(&[0, 1])
    }

    /// L1 agent with no skills.
    pub fn bob() -> Agent {
        Agent::new("B", "Bob", SupportLevel::L1)
    }

    /// Agent with 2 fresh, 3 recent, 3 stale and 2 abandoned tickets
    /// (weighted load 9.3 under the default decay).
    pub fn mixed_load_agent() -> Agent {
        Agent::new("M", "Morgan", SupportLevel::L2)
            .with_skills(&["vpn", "password_reset"])
            .with_location(Location::new("Toronto", "America/Toronto", vec![SupportMode::Remote]))
            .with_open_ticket_ages(&[0, 1, 2, 3, 5, 6, 10, 14, 15, 30])
    }

    /// Agent whose leave covers `now`.
    pub fn agent_on_leave(now: Timestamp) -> Agent {
        Agent::new("L", "Lee", SupportLevel::L3)
            .with_skills(&["password_reset"])
            .with_leave(Leave::active(
                "vacation",
                Some(now - chrono::Duration::days(1)),
                Some(now + chrono::Duration::days(6)),
            ))
    }

    /// Snapshot synced one minute before `now`.
    pub fn fresh_snapshot(agents: Vec<Agent>, now: Timestamp) -> PoolSnapshot {
        PoolSnapshot {
            agents,
            synced_at: Some(now - chrono::Duration::minutes(1)),
            version: 1,
        }
    }

    /// Snapshot last synced `minutes` before `now`.
    pub fn snapshot_synced_ago(agents: Vec<Agent>, now: Timestamp, minutes: i64) -> PoolSnapshot {
        PoolSnapshot {
            agents,
            synced_at: Some(now - chrono::Duration::minutes(minutes)),
            version: 1,
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for ROUTEWISE-specific validation.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &RoutewiseResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &RoutewiseResult<T>) {
        match result {
            Err(RoutewiseError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert the result is an exhausted rate limit after `attempts` tries.
    #[track_caller]
    pub fn assert_rate_limited<T: std::fmt::Debug>(result: &RoutewiseResult<T>, attempts: u32) {
        match result {
            Err(RoutewiseError::Sync(SyncError::RateLimited { attempts: a, .. })) => {
                assert_eq!(*a, attempts, "Wrong attempt count in RateLimited error");
            }
            other => panic!("Expected RateLimited error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_request_failed<T: std::fmt::Debug>(result: &RoutewiseResult<T>, status: u16) {
        match result {
            Err(RoutewiseError::Sync(SyncError::RequestFailed { status: s, .. })) => {
                assert_eq!(*s, status, "Wrong status in RequestFailed error");
            }
            other => panic!("Expected RequestFailed({}), got: {:?}", status, other),
        }
    }

    #[track_caller]
    pub fn assert_agent_not_found<T: std::fmt::Debug>(result: &RoutewiseResult<T>) {
        match result {
            Err(RoutewiseError::Engine(EngineError::AgentNotFound { .. })) => {}
            other => panic!("Expected AgentNotFound, got: {:?}", other),
        }
    }

    /// Every factor and the total lie in [0, 1].
    #[track_caller]
    pub fn assert_decision_scores_bounded(decision: &Decision) {
        for candidate in &decision.ranked {
            let b = &candidate.breakdown;
            for (name, value) in [
                ("skill", b.skill),
                ("level", b.level),
                ("workload", b.workload),
                ("location", b.location),
                ("vip", b.vip),
                ("total", b.total),
            ] {
                assert!(
                    (0.0..=1.0).contains(&value),
                    "{} score {} for agent {} out of range",
                    name,
                    value,
                    b.agent_id
                );
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
