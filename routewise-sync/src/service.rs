//! Agent pool sync service
//!
//! Periodically pulls the agent list from the directory and publishes it
//! as a new snapshot. A failed sync leaves the last good snapshot in
//! place; decisions made from it are flagged stale once it ages out of
//! the freshness window.

use routewise_core::constants::{DEFAULT_SYNC_INTERVAL_SECS, DEFAULT_UPSTREAM_URL};
use routewise_core::{AgentDirectory, Clock, RoutewiseResult, SnapshotStore, SystemClock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Upstream connection and sync cadence.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub upstream_url: String,
    pub upstream_token: Option<String>,
    pub sync_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_token: None,
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
        }
    }
}

impl SyncSettings {
    /// Create SyncSettings from environment variables.
    ///
    /// # Environment Variables
    /// - `ROUTEWISE_UPSTREAM_URL`: Base URL of the ticketing API
    /// - `ROUTEWISE_UPSTREAM_TOKEN`: Bearer token (optional)
    /// - `ROUTEWISE_SYNC_INTERVAL_SECS`: Seconds between pool syncs (default: 60)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let upstream_url = lookup("ROUTEWISE_UPSTREAM_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());

        let upstream_token = lookup("ROUTEWISE_UPSTREAM_TOKEN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let sync_interval = Duration::from_secs(
            lookup("ROUTEWISE_SYNC_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS),
        );

        Self {
            upstream_url,
            upstream_token,
            sync_interval,
        }
    }
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSettings")
            .field("upstream_url", &self.upstream_url)
            .field("upstream_token", &self.upstream_token.as_ref().map(|_| "[REDACTED]"))
            .field("sync_interval", &self.sync_interval)
            .finish()
    }
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Default)]
pub struct SyncMetrics {
    pub syncs_succeeded: AtomicU64,
    pub syncs_failed: AtomicU64,
}

impl SyncMetrics {
    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            syncs_succeeded: self.syncs_succeeded.load(Ordering::Relaxed),
            syncs_failed: self.syncs_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncMetricsSnapshot {
    pub syncs_succeeded: u64,
    pub syncs_failed: u64,
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct SyncService {
    directory: Arc<dyn AgentDirectory>,
    snapshots: Arc<SnapshotStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<SyncMetrics>,
}

impl SyncService {
    pub fn new(directory: Arc<dyn AgentDirectory>, snapshots: Arc<SnapshotStore>) -> Self {
        Self {
            directory,
            snapshots,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(SyncMetrics::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn snapshots(&self) -> &Arc<SnapshotStore> {
        &self.snapshots
    }

    /// Pull the agent list once and publish it. Returns the new snapshot
    /// version.
    pub async fn sync_once(&self) -> RoutewiseResult<u64> {
        match self.directory.list_available_agents().await {
            Ok(agents) => {
                let count = agents.len();
                let version = self.snapshots.publish(agents, self.clock.now());
                self.metrics.syncs_succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::info!(version, agents = count, "Agent pool synced");
                Ok(version)
            }
            Err(e) => {
                self.metrics.syncs_failed.fetch_add(1, Ordering::Relaxed);
                self.snapshots.record_failure(e.to_string(), self.clock.now());
                tracing::warn!(
                    error = %e,
                    last_successful_sync = ?self.snapshots.last_successful_sync(),
                    "Agent pool sync failed; keeping last snapshot"
                );
                Err(e)
            }
        }
    }

    /// Sync on every tick of `every` until `shutdown_rx` flips to true.
    pub async fn run(&self, every: Duration, mut shutdown_rx: watch::Receiver<bool>) -> SyncMetricsSnapshot {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = every.as_secs(), "Agent pool sync started");

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("Agent pool sync shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // Failures are logged and counted inside sync_once
                    let _ = self.sync_once().await;
                }
            }
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            syncs_succeeded = snapshot.syncs_succeeded,
            syncs_failed = snapshot.syncs_failed,
            "Agent pool sync stopped"
        );
        snapshot
    }
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("snapshots", &self.snapshots)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routewise_core::{RoutewiseError, SyncError};
    use routewise_test_utils::{fixtures, FixedClock, InMemoryDirectory};
    use std::collections::HashMap;

    fn transport_error() -> RoutewiseError {
        SyncError::Transport {
            context: "list agents".to_string(),
            reason: "connection refused".to_string(),
        }
        .into()
    }

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("ROUTEWISE_UPSTREAM_URL", "https://tickets.example.com/api"),
            ("ROUTEWISE_UPSTREAM_TOKEN", "t0ken"),
            ("ROUTEWISE_SYNC_INTERVAL_SECS", "15"),
        ]
        .into_iter()
        .collect();
        let settings = SyncSettings::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(settings.upstream_url, "https://tickets.example.com/api");
        assert_eq!(settings.upstream_token.as_deref(), Some("t0ken"));
        assert_eq!(settings.sync_interval, Duration::from_secs(15));
        assert!(!format!("{:?}", settings).contains("t0ken"));
    }

    #[test]
    fn test_settings_defaults_on_bad_values() {
        let settings = SyncSettings::from_lookup(|k| match k {
            "ROUTEWISE_SYNC_INTERVAL_SECS" => Some("0".to_string()),
            "ROUTEWISE_UPSTREAM_TOKEN" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(settings, SyncSettings::default());
    }

    #[tokio::test]
    async fn test_sync_once_publishes_snapshot() {
        let now = chrono::Utc::now();
        let directory = Arc::new(InMemoryDirectory::new(vec![fixtures::alice(), fixtures::bob()]));
        let snapshots = Arc::new(SnapshotStore::new());
        let service = SyncService::new(directory, snapshots.clone()).with_clock(Arc::new(FixedClock::new(now)));

        let version = service.sync_once().await.unwrap();
        let snapshot = snapshots.load();
        assert_eq!(snapshot.version, version);
        assert_eq!(snapshot.agents.len(), 2);
        assert_eq!(snapshot.synced_at, Some(now));
        assert_eq!(service.metrics().syncs_succeeded, 1);
    }

    #[tokio::test]
    async fn test_failed_sync_keeps_last_snapshot() {
        let directory = Arc::new(InMemoryDirectory::new(vec![fixtures::alice()]));
        let snapshots = Arc::new(SnapshotStore::new());
        let service = SyncService::new(directory.clone(), snapshots.clone());

        let first = service.sync_once().await.unwrap();
        directory.fail_with(Some(transport_error()));
        assert!(service.sync_once().await.is_err());

        let snapshot = snapshots.load();
        assert_eq!(snapshot.version, first);
        assert_eq!(snapshot.agents.len(), 1);
        assert!(snapshots.last_failure().is_some());
        assert_eq!(service.metrics(), SyncMetricsSnapshot { syncs_succeeded: 1, syncs_failed: 1 });

        directory.fail_with(None);
        service.sync_once().await.unwrap();
        assert!(snapshots.last_failure().is_none());
    }

    #[tokio::test]
    async fn test_sync_replaces_departed_agents() {
        let directory = Arc::new(InMemoryDirectory::new(vec![fixtures::alice(), fixtures::bob()]));
        let snapshots = Arc::new(SnapshotStore::new());
        let service = SyncService::new(directory.clone(), snapshots.clone());

        service.sync_once().await.unwrap();
        let held = snapshots.load();
        directory.set_agents(vec![fixtures::bob()]);
        service.sync_once().await.unwrap();

        let current = snapshots.load();
        assert_eq!(current.agents.len(), 1);
        assert_eq!(current.agents[0].agent_id, fixtures::bob().agent_id);
        assert_eq!(held.agents.len(), 2);
        assert_eq!(current.version, held.version + 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let directory = Arc::new(InMemoryDirectory::new(vec![fixtures::alice()]));
        let snapshots = Arc::new(SnapshotStore::new());
        let service = Arc::new(SyncService::new(directory.clone(), snapshots.clone()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = service.clone();
        let handle = tokio::spawn(async move { runner.run(Duration::from_millis(10), shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        let metrics = handle.await.unwrap();

        assert!(metrics.syncs_succeeded >= 1);
        assert!(directory.agent_calls() >= 1);
        assert!(snapshots.last_successful_sync().is_some());
    }
}
