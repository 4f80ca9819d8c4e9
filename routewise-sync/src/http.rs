//! HTTP adapter for the upstream ticketing system
//!
//! Thin reqwest wrapper: one request per call, no retries. Status and
//! header handling is mapped onto [`UpstreamFailure`] so the retry
//! executor can classify it.

use crate::rate_limit::{RateLimitHeaders, HEADER_RETRY_AFTER};
use crate::retry::{UpstreamFailure, UpstreamResponse};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use routewise_core::{
    Agent, AgentId, ConfigError, Decision, DecisionId, DecisionType, RoutewiseResult, SyncError,
    Ticket, TicketId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body posted upstream when a ticket is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub ticket_id: TicketId,
    pub agent_id: AgentId,
    pub decision_id: DecisionId,
    pub decision_type: DecisionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

impl AssignmentRequest {
    /// Assignment for decisions that route a ticket without waiting for
    /// confirmation: auto-assignments and manual overrides.
    pub fn from_decision(decision: &Decision) -> Option<Self> {
        let decision_type = decision.decision_type()?;
        if decision_type == DecisionType::Suggested {
            return None;
        }
        Some(Self {
            ticket_id: decision.ticket_id.clone(),
            agent_id: decision.chosen_agent_id.clone()?,
            decision_id: decision.decision_id,
            decision_type,
            score: decision.chosen_score(),
            override_reason: decision.override_reason.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AgentList {
    agents: Vec<Agent>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(alias = "error")]
    message: String,
}

/// Operations the sync client needs from the upstream ticketing system.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    async fn fetch_agents(&self) -> Result<UpstreamResponse<Vec<Agent>>, UpstreamFailure>;

    async fn fetch_ticket(&self, ticket_id: &TicketId) -> Result<UpstreamResponse<Ticket>, UpstreamFailure>;

    async fn post_assignment(&self, assignment: &AssignmentRequest) -> Result<UpstreamResponse<()>, UpstreamFailure>;
}

fn rate_limit_headers(headers: &HeaderMap) -> RateLimitHeaders {
    RateLimitHeaders::from_lookup(|name| headers.get(name).and_then(|v| v.to_str().ok()))
}

/// reqwest client for the upstream REST API.
///
/// Upstream ids are opaque: each one is pushed as a single percent-encoded
/// path segment, so `/`, `?` or `#` inside an id never change the target.
#[derive(Clone)]
pub struct HttpTicketingClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTicketingClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> RoutewiseResult<Self> {
        Self::with_timeout(base_url, token, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> RoutewiseResult<Self> {
        let raw = base_url.into();
        let base_url = Url::parse(&raw)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "upstream_url".to_string(),
                value: raw.clone(),
                reason: "must be an absolute http(s) URL".to_string(),
            })?;

        let client = Client::builder().timeout(timeout).build().map_err(|e| SyncError::Transport {
            context: "build http client".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL extended by `segments`, each encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, UpstreamFailure> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamFailure::Transport {
                reason: format!("{} cannot be a base URL", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and return the raw body, mapping non-success statuses.
    async fn send(&self, request: RequestBuilder) -> Result<(String, RateLimitHeaders), UpstreamFailure> {
        let response = self
            .authorized(request)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| UpstreamFailure::Transport {
                reason: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        let rate_limit = rate_limit_headers(response.headers());

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(HEADER_RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Err(UpstreamFailure::RateLimited {
                retry_after,
                rate_limit,
            });
        }

        let text = response.text().await.map_err(|e| UpstreamFailure::Transport {
            reason: format!("Failed to read response body: {}", e),
        })?;

        if status.is_success() {
            return Ok((text, rate_limit));
        }

        let message = serde_json::from_str::<ApiError>(&text)
            .map(|e| e.message)
            .unwrap_or(text);
        Err(UpstreamFailure::Status {
            status: status.as_u16(),
            message,
            rate_limit,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<UpstreamResponse<T>, UpstreamFailure> {
        let (text, rate_limit) = self.send(self.client.get(self.url(segments)?)).await?;
        let body = serde_json::from_str(&text).map_err(|e| UpstreamFailure::InvalidResponse {
            reason: format!("Failed to parse response: {}", e),
            rate_limit,
        })?;
        Ok(UpstreamResponse { body, rate_limit })
    }
}

#[async_trait]
impl UpstreamApi for HttpTicketingClient {
    async fn fetch_agents(&self) -> Result<UpstreamResponse<Vec<Agent>>, UpstreamFailure> {
        let response = self.get_json::<AgentList>(&["agents"]).await?;
        Ok(UpstreamResponse {
            body: response.body.agents,
            rate_limit: response.rate_limit,
        })
    }

    async fn fetch_ticket(&self, ticket_id: &TicketId) -> Result<UpstreamResponse<Ticket>, UpstreamFailure> {
        self.get_json(&["tickets", ticket_id.as_str()]).await
    }

    async fn post_assignment(&self, assignment: &AssignmentRequest) -> Result<UpstreamResponse<()>, UpstreamFailure> {
        let url = self.url(&["tickets", assignment.ticket_id.as_str(), "assignment"])?;
        let request = self.client.post(url).json(assignment);
        let (_, rate_limit) = self.send(request).await?;
        Ok(UpstreamResponse { body: (), rate_limit })
    }
}

impl std::fmt::Debug for HttpTicketingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTicketingClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
