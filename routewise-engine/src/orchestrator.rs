//! Decision orchestration
//!
//! One pass per ticket: pin the current config and agent pool, filter,
//! score, rank, then apply the confidence thresholds and the freshness
//! downgrade. The pure part lives in [`evaluate`]; [`DecisionEngine`] adds
//! shared state, the sink, and override bookkeeping around it.

use crate::eligibility::filter_eligible;
use crate::ranking::rank_candidates;
use crate::scoring::{self, score_candidates};
use crate::workload;
use dashmap::DashMap;
use routewise_core::{
    new_decision_id, Agent, AgentDirectory, AgentId, Clock, ConfigStore, Decision,
    DecisionOutcome, DecisionSink, EngineConfig, EngineError, PoolSnapshot, RankedCandidate,
    RoutewiseResult, ScoreBreakdown, SnapshotStore, SystemClock, Ticket, TicketId, Timestamp,
    TracingDecisionSink, WeightedLoad,
};
use std::sync::Arc;

/// What the engine remembers about a ticket between calls.
#[derive(Debug, Clone)]
struct TicketHistory {
    ticket: Option<Ticket>,
    decision: Decision,
}

/// Route `ticket` against `snapshot` using `config`.
///
/// Pure: the same inputs produce the same outcome, candidate order and
/// breakdowns (only `decision_id` differs between calls).
pub fn evaluate(ticket: &Ticket, snapshot: &PoolSnapshot, config: &EngineConfig, now: Timestamp) -> Decision {
    let stale_data = !snapshot.is_fresh(now, config.freshness_window());
    let filtered = filter_eligible(ticket, &snapshot.agents, now);

    let mut decision = Decision {
        decision_id: new_decision_id(),
        ticket_id: ticket.ticket_id.clone(),
        outcome: DecisionOutcome::NoEligibleAgent,
        chosen_agent_id: None,
        breakdown: None,
        alternatives: Vec::new(),
        ranked: Vec::new(),
        rejections: filtered.rejections.clone(),
        stale_data,
        reason: String::new(),
        supersedes: None,
        override_reason: None,
        decided_at: now,
    };

    if filtered.is_empty() {
        decision.reason = format!(
            "No eligible agent among {} in the pool; queued for manual triage",
            snapshot.agents.len()
        );
        return decision;
    }

    let scored = score_candidates(ticket, &filtered.eligible, config);
    let ranked = rank_candidates(scored, config.tie_epsilon);
    let top = ranked[0].breakdown.clone();
    let thresholds = config.thresholds;

    let outcome = if top.total >= thresholds.auto_assign {
        if stale_data {
            DecisionOutcome::Suggested
        } else {
            DecisionOutcome::AutoAssigned
        }
    } else if top.total >= thresholds.suggest {
        DecisionOutcome::Suggested
    } else {
        DecisionOutcome::NoConfidentMatch
    };

    decision.reason = match outcome {
        DecisionOutcome::AutoAssigned => format!(
            "Score {:.3} meets auto-assign threshold {:.3}",
            top.total, thresholds.auto_assign
        ),
        DecisionOutcome::Suggested if top.total >= thresholds.auto_assign => format!(
            "Score {:.3} meets auto-assign threshold {:.3} but agent data is stale; suggesting instead",
            top.total, thresholds.auto_assign
        ),
        DecisionOutcome::Suggested => format!(
            "Score {:.3} meets suggest threshold {:.3}; awaiting confirmation",
            top.total, thresholds.suggest
        ),
        _ => format!(
            "Best score {:.3} is below suggest threshold {:.3}",
            top.total, thresholds.suggest
        ),
    };

    decision.outcome = outcome;
    if outcome != DecisionOutcome::NoConfidentMatch {
        decision.chosen_agent_id = Some(top.agent_id.clone());
        decision.breakdown = Some(top);
        decision.alternatives = ranked
            .iter()
            .skip(1)
            .take(config.alternatives_count)
            .cloned()
            .collect();
    }
    decision.ranked = ranked;
    decision
}

/// Routes tickets against the latest published agent pool.
pub struct DecisionEngine {
    config: Arc<ConfigStore>,
    snapshots: Arc<SnapshotStore>,
    sink: Arc<dyn DecisionSink>,
    clock: Arc<dyn Clock>,
    latest: DashMap<TicketId, TicketHistory>,
}

impl DecisionEngine {
    pub fn new(config: Arc<ConfigStore>, snapshots: Arc<SnapshotStore>) -> Self {
        Self {
            config,
            snapshots,
            sink: Arc::new(TracingDecisionSink),
            clock: Arc::new(SystemClock),
            latest: DashMap::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    /// Route a ticket. Never fails: lack of candidates or confidence is
    /// reported as an outcome.
    pub fn decide(&self, ticket: &Ticket) -> Decision {
        let config = self.config.current();
        let snapshot = self.snapshots.load();
        let now = self.clock.now();

        let decision = evaluate(ticket, &snapshot, &config, now);

        tracing::debug!(
            ticket_id = %ticket.ticket_id,
            snapshot_version = snapshot.version,
            config_version = self.config.version(),
            outcome = ?decision.outcome,
            "Decision pass complete"
        );

        self.remember(Some(ticket.clone()), decision.clone());
        self.sink.record(decision.clone());
        decision
    }

    /// Fetch the ticket from `directory` and route it.
    pub async fn decide_by_id(
        &self,
        directory: &dyn AgentDirectory,
        ticket_id: &TicketId,
    ) -> RoutewiseResult<Decision> {
        let ticket = directory.get_ticket(ticket_id).await?;
        Ok(self.decide(&ticket))
    }

    /// Record a human reassignment of `ticket_id` to `agent_id`.
    pub fn override_assignment(
        &self,
        ticket_id: &TicketId,
        agent_id: &AgentId,
        reason: &str,
    ) -> RoutewiseResult<Decision> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::InvalidOverride {
                ticket_id: ticket_id.clone(),
                reason: "override reason must not be empty".to_string(),
            }
            .into());
        }

        let snapshot = self.snapshots.load();
        let agent = snapshot
            .find_agent(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound {
                agent_id: agent_id.clone(),
            })?;

        let prior = self.latest.get(ticket_id).map(|entry| entry.value().clone());
        let breakdown = prior.as_ref().and_then(|history| {
            history
                .decision
                .ranked
                .iter()
                .find(|c| c.agent_id() == agent_id)
                .map(|c| c.breakdown.clone())
                .or_else(|| {
                    let config = self.config.current();
                    history
                        .ticket
                        .as_ref()
                        .map(|ticket| scoring::score_agent(ticket, agent, &config))
                })
        });

        let now = self.clock.now();
        let decision = Decision {
            decision_id: new_decision_id(),
            ticket_id: ticket_id.clone(),
            outcome: DecisionOutcome::ManualOverride,
            chosen_agent_id: Some(agent_id.clone()),
            breakdown,
            alternatives: Vec::new(),
            ranked: prior
                .as_ref()
                .map(|h| h.decision.ranked.clone())
                .unwrap_or_default(),
            rejections: prior
                .as_ref()
                .map(|h| h.decision.rejections.clone())
                .unwrap_or_default(),
            stale_data: !snapshot.is_fresh(now, self.config.current().freshness_window()),
            reason: format!("Manual override to {}", agent.name),
            supersedes: prior.as_ref().map(|h| h.decision.decision_id),
            override_reason: Some(reason.to_string()),
            decided_at: now,
        };

        tracing::info!(
            ticket_id = %ticket_id,
            agent_id = %agent_id,
            supersedes = ?decision.supersedes,
            "Manual override recorded"
        );

        self.remember(prior.and_then(|h| h.ticket), decision.clone());
        self.sink.record(decision.clone());
        Ok(decision)
    }

    /// Score one agent for a ticket with the current config.
    pub fn score_agent(&self, ticket: &Ticket, agent: &Agent) -> ScoreBreakdown {
        scoring::score_agent(ticket, agent, &self.config.current())
    }

    /// Weighted load of an agent with the current decay settings.
    pub fn compute_weighted_load(&self, agent: &Agent) -> WeightedLoad {
        workload::compute_weighted_load(agent, &self.config.current().decay)
    }

    pub fn latest_decision(&self, ticket_id: &TicketId) -> Option<Decision> {
        self.latest.get(ticket_id).map(|entry| entry.decision.clone())
    }

    /// Runner-ups of the latest decision for a ticket.
    pub fn alternatives(&self, ticket_id: &TicketId) -> Vec<RankedCandidate> {
        self.latest
            .get(ticket_id)
            .map(|entry| entry.decision.alternatives.clone())
            .unwrap_or_default()
    }

    /// Drop the remembered decision for a ticket once it needs no further
    /// overrides. Returns the decision that was dropped.
    pub fn forget(&self, ticket_id: &TicketId) -> Option<Decision> {
        let (_, history) = self.latest.remove(ticket_id)?;
        tracing::trace!(ticket_id = %ticket_id, "Forgot ticket decision");
        Some(history.decision)
    }

    /// Tickets with a remembered decision.
    pub fn tracked_tickets(&self) -> usize {
        self.latest.len()
    }

    fn remember(&self, ticket: Option<Ticket>, decision: Decision) {
        self.latest
            .insert(decision.ticket_id.clone(), TicketHistory { ticket, decision });
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("config_version", &self.config.version())
            .field("snapshots", &self.snapshots)
            .field("tracked_tickets", &self.tracked_tickets())
            .finish()
    }
}
