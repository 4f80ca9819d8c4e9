//! Collaborator interfaces consumed by the engine

use crate::{Agent, Decision, RoutewiseResult, Ticket, TicketId};
use async_trait::async_trait;

/// Source of agent and ticket records, eventually consistent with the
/// upstream ticketing system.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn list_available_agents(&self) -> RoutewiseResult<Vec<Agent>>;

    async fn get_ticket(&self, ticket_id: &TicketId) -> RoutewiseResult<Ticket>;
}

/// Receiver of finished decisions (audit log, storage, notifications).
///
/// Fire-and-forget: implementations must not block the caller on
/// persistence.
pub trait DecisionSink: Send + Sync {
    fn record(&self, decision: Decision);
}

/// Sink that only emits a structured log line per decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDecisionSink;

impl DecisionSink for TracingDecisionSink {
    fn record(&self, decision: Decision) {
        tracing::info!(
            decision_id = %decision.decision_id,
            ticket_id = %decision.ticket_id,
            outcome = ?decision.outcome,
            chosen_agent = ?decision.chosen_agent_id.as_ref().map(|a| a.as_str()),
            score = ?decision.chosen_score(),
            stale_data = decision.stale_data,
            candidates = decision.ranked.len(),
            "Decision recorded"
        );
    }
}
