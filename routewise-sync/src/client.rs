//! Resilient sync client
//!
//! Composes an [`UpstreamApi`] with the retry executor and exposes it to
//! the engine as an [`AgentDirectory`].

use crate::http::{AssignmentRequest, UpstreamApi};
use crate::rate_limit::RateLimitState;
use crate::retry::ResilientExecutor;
use async_trait::async_trait;
use routewise_core::{Agent, AgentDirectory, Decision, RoutewiseResult, Ticket, TicketId};

pub struct ResilientSyncClient<A> {
    api: A,
    executor: ResilientExecutor,
}

impl<A: UpstreamApi> ResilientSyncClient<A> {
    pub fn new(api: A, executor: ResilientExecutor) -> Self {
        Self { api, executor }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    /// Last quota reported by upstream.
    pub fn rate_limit_state(&self) -> RateLimitState {
        self.executor.rate_limit_state().snapshot()
    }

    /// Forward a routed decision upstream.
    ///
    /// Only auto-assignments and manual overrides are pushed; returns
    /// `false` for anything else without contacting upstream.
    pub async fn push_decision(&self, decision: &Decision) -> RoutewiseResult<bool> {
        let Some(assignment) = AssignmentRequest::from_decision(decision) else {
            tracing::debug!(
                decision_id = %decision.decision_id,
                outcome = ?decision.outcome,
                "Decision not pushed upstream"
            );
            return Ok(false);
        };

        self.executor
            .execute_with_retry("push assignment", |_| self.api.post_assignment(&assignment))
            .await?;

        tracing::info!(
            decision_id = %decision.decision_id,
            ticket_id = %assignment.ticket_id,
            agent_id = %assignment.agent_id,
            "Assignment pushed upstream"
        );
        Ok(true)
    }
}

#[async_trait]
impl<A: UpstreamApi> AgentDirectory for ResilientSyncClient<A> {
    async fn list_available_agents(&self) -> RoutewiseResult<Vec<Agent>> {
        self.executor
            .execute_with_retry("list agents", |_| self.api.fetch_agents())
            .await
    }

    async fn get_ticket(&self, ticket_id: &TicketId) -> RoutewiseResult<Ticket> {
        let context = format!("get ticket {}", ticket_id);
        self.executor
            .execute_with_retry(&context, |_| self.api.fetch_ticket(ticket_id))
            .await
    }
}

impl<A: std::fmt::Debug> std::fmt::Debug for ResilientSyncClient<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientSyncClient")
            .field("api", &self.api)
            .field("executor", &self.executor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimitHeaders;
    use crate::retry::{UpstreamFailure, UpstreamResponse};
    use chrono::Utc;
    use parking_lot::Mutex;
    use routewise_core::{new_decision_id, DecisionOutcome, SupportLevel};
    use routewise_test_utils::{fixtures, ManualClock, RecordingSleeper};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    /// Upstream that replays scripted agent-list results.
    #[derive(Default)]
    struct ScriptedApi {
        agent_results: Mutex<VecDeque<Result<UpstreamResponse<Vec<Agent>>, UpstreamFailure>>>,
        assignments: Mutex<Vec<AssignmentRequest>>,
    }

    impl ScriptedApi {
        fn then(self, result: Result<UpstreamResponse<Vec<Agent>>, UpstreamFailure>) -> Self {
            self.agent_results.lock().push_back(result);
            self
        }
    }

    #[async_trait]
    impl UpstreamApi for ScriptedApi {
        async fn fetch_agents(&self) -> Result<UpstreamResponse<Vec<Agent>>, UpstreamFailure> {
            self.agent_results
                .lock()
                .pop_front()
                .unwrap_or(Err(UpstreamFailure::Transport { reason: "script exhausted".to_string() }))
        }

        async fn fetch_ticket(&self, ticket_id: &TicketId) -> Result<UpstreamResponse<Ticket>, UpstreamFailure> {
            Ok(UpstreamResponse {
                body: Ticket::new(ticket_id.clone(), "Scripted", SupportLevel::L1),
                rate_limit: RateLimitHeaders::default(),
            })
        }

        async fn post_assignment(&self, assignment: &AssignmentRequest) -> Result<UpstreamResponse<()>, UpstreamFailure> {
            self.assignments.lock().push(assignment.clone());
            Ok(UpstreamResponse { body: (), rate_limit: RateLimitHeaders::default() })
        }
    }

    fn client(api: ScriptedApi) -> (ResilientSyncClient<ScriptedApi>, Arc<RecordingSleeper>) {
        let clock = Arc::new(ManualClock::starting_now());
        let sleeper = Arc::new(RecordingSleeper::with_clock(clock.clone()));
        let executor = ResilientExecutor::new(Default::default())
            .with_clock(clock)
            .with_sleeper(sleeper.clone());
        (ResilientSyncClient::new(api, executor), sleeper)
    }

    #[tokio::test]
    async fn test_list_agents_retries_rate_limit() {
        let api = ScriptedApi::default()
            .then(Err(UpstreamFailure::RateLimited {
                retry_after: Some("2".to_string()),
                rate_limit: RateLimitHeaders { limit: Some(100), remaining: Some(0), reset: Some(2) },
            }))
            .then(Ok(UpstreamResponse {
                body: vec![fixtures::alice()],
                rate_limit: RateLimitHeaders { limit: Some(100), remaining: Some(99), reset: Some(60) },
            }));
        let (client, sleeper) = client(api);

        let agents = client.list_available_agents().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(sleeper.delays(), vec![Duration::from_secs(2)]);
        assert_eq!(client.rate_limit_state().remaining, Some(99));
    }

    #[tokio::test]
    async fn test_get_ticket_passes_through() {
        let (client, _) = client(ScriptedApi::default());
        let ticket = client.get_ticket(&"T-9".into()).await.unwrap();
        assert_eq!(ticket.ticket_id.as_str(), "T-9");
    }

    #[tokio::test]
    async fn test_push_decision_filters_outcomes() {
        let (client, _) = client(ScriptedApi::default());
        let mut decision = Decision {
            decision_id: new_decision_id(),
            ticket_id: "T-1".into(),
            outcome: DecisionOutcome::Suggested,
            chosen_agent_id: Some("A".into()),
            breakdown: None,
            alternatives: Vec::new(),
            ranked: Vec::new(),
            rejections: Vec::new(),
            stale_data: true,
            reason: String::new(),
            supersedes: None,
            override_reason: None,
            decided_at: Utc::now(),
        };

        assert!(!client.push_decision(&decision).await.unwrap());
        assert!(client.api().assignments.lock().is_empty());

        decision.outcome = DecisionOutcome::ManualOverride;
        decision.override_reason = Some("Customer request".to_string());
        assert!(client.push_decision(&decision).await.unwrap());

        let pushed = client.api().assignments.lock().clone();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].agent_id.as_str(), "A");
        assert_eq!(pushed[0].override_reason.as_deref(), Some("Customer request"));
    }
}
