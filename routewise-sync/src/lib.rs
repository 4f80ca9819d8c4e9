//! ROUTEWISE Sync - Upstream Ticketing Integration
//!
//! Keeps the engine's view of the agent pool current without tripping the
//! upstream API's rate limits:
//! - Rate-limit header tracking and proactive throttling
//! - Retry executor for 429 responses (`Retry-After` aware)
//! - reqwest adapter for the upstream REST API
//! - `AgentDirectory` implementation and decision push-back
//! - Background snapshot sync with graceful shutdown

pub mod client;
pub mod http;
pub mod rate_limit;
pub mod retry;
pub mod service;

pub use client::ResilientSyncClient;
pub use http::{AssignmentRequest, HttpTicketingClient, UpstreamApi};
pub use rate_limit::{parse_retry_after, RateLimitHeaders, RateLimitState, SharedRateLimitState};
pub use retry::{ResilientExecutor, TokioSleeper, UpstreamFailure, UpstreamResponse};
pub use service::{SyncMetrics, SyncMetricsSnapshot, SyncService, SyncSettings};

/// Sync client talking HTTP to the configured upstream.
pub type HttpSyncClient = ResilientSyncClient<HttpTicketingClient>;
