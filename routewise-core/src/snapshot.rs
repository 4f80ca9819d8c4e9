//! Agent pool snapshots
//!
//! The sync client publishes a new immutable snapshot after every
//! successful sync. Decision passes load one `Arc<PoolSnapshot>` at the
//! start and never observe a pool being replaced underneath them.
//!
//! Publishers are serialized; readers never take the lock.

use crate::{Agent, AgentId, Timestamp};
use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable view of the agent pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub agents: Vec<Agent>,
    /// When upstream last confirmed this data; `None` for seeded pools
    pub synced_at: Option<Timestamp>,
    pub version: u64,
}

impl PoolSnapshot {
    pub fn empty() -> Self {
        Self {
            agents: Vec::new(),
            synced_at: None,
            version: 0,
        }
    }

    pub fn find_agent(&self, agent_id: &AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| &a.agent_id == agent_id)
    }

    /// Age of the data at `now`, if it was ever synced.
    pub fn age(&self, now: Timestamp) -> Option<chrono::Duration> {
        self.synced_at.map(|at| now.signed_duration_since(at))
    }

    /// Fresh when synced within `window`. Unsynced pools are never fresh.
    pub fn is_fresh(&self, now: Timestamp, window: chrono::Duration) -> bool {
        self.age(now).map_or(false, |age| age <= window)
    }
}

/// Most recent failed sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub reason: String,
    pub failed_at: Timestamp,
}

/// Publishes agent pool snapshots to decision passes.
pub struct SnapshotStore {
    current: ArcSwap<PoolSnapshot>,
    last_failure: ArcSwapOption<SyncFailure>,
    writer: Mutex<()>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(PoolSnapshot::empty()),
            last_failure: ArcSwapOption::empty(),
            writer: Mutex::new(()),
        }
    }

    /// Store seeded with agents that did not come from a sync, so every
    /// decision made from it counts as stale.
    pub fn seeded(agents: Vec<Agent>) -> Self {
        let store = Self::new();
        store.current.store(Arc::new(PoolSnapshot {
            agents,
            synced_at: None,
            version: 1,
        }));
        store
    }

    pub fn load(&self) -> Arc<PoolSnapshot> {
        self.current.load_full()
    }

    /// Publish agents confirmed by upstream at `synced_at`.
    ///
    /// A pool synced before the published one is dropped and the current
    /// version is returned unchanged.
    pub fn publish(&self, agents: Vec<Agent>, synced_at: Timestamp) -> u64 {
        let _writer = self.writer.lock();
        let current = self.current.load_full();
        if current.synced_at.is_some_and(|at| at > synced_at) {
            tracing::debug!(
                version = current.version,
                %synced_at,
                "Ignoring agent pool older than the published snapshot"
            );
            return current.version;
        }

        let version = current.version + 1;
        let count = agents.len();
        self.current.store(Arc::new(PoolSnapshot {
            agents,
            synced_at: Some(synced_at),
            version,
        }));
        self.last_failure.store(None);
        tracing::debug!(version, agents = count, %synced_at, "Published agent pool snapshot");
        version
    }

    /// Remember a failed sync. The current snapshot stays in place.
    pub fn record_failure(&self, reason: impl Into<String>, failed_at: Timestamp) {
        self.last_failure.store(Some(Arc::new(SyncFailure {
            reason: reason.into(),
            failed_at,
        })));
    }

    pub fn last_successful_sync(&self) -> Option<Timestamp> {
        self.current.load().synced_at
    }

    pub fn last_failure(&self) -> Option<SyncFailure> {
        self.last_failure.load_full().map(|f| (*f).clone())
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.current.load();
        f.debug_struct("SnapshotStore")
            .field("version", &snapshot.version)
            .field("agents", &snapshot.agents.len())
            .field("synced_at", &snapshot.synced_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SupportLevel;
    use chrono::{Duration, Utc};

    #[test]
    fn test_seeded_snapshot_is_never_fresh() {
        let store = SnapshotStore::seeded(vec![Agent::new("a1", "Ada", SupportLevel::L1)]);
        let snapshot = store.load();
        assert_eq!(snapshot.agents.len(), 1);
        assert!(!snapshot.is_fresh(Utc::now(), Duration::days(365)));
    }

    #[test]
    fn test_publish_bumps_version_and_clears_failure() {
        let store = SnapshotStore::new();
        let now = Utc::now();
        store.record_failure("upstream down", now);
        assert!(store.last_failure().is_some());

        let v = store.publish(vec![Agent::new("a1", "Ada", SupportLevel::L1)], now);
        assert_eq!(v, 1);
        assert!(store.last_failure().is_none());
        assert_eq!(store.last_successful_sync(), Some(now));
    }

    #[test]
    fn test_freshness_window_boundary() {
        let now = Utc::now();
        let snapshot = PoolSnapshot {
            agents: vec![],
            synced_at: Some(now - Duration::minutes(15)),
            version: 1,
        };
        assert!(snapshot.is_fresh(now, Duration::minutes(15)));
        assert!(!snapshot.is_fresh(now, Duration::minutes(14)));
    }

    #[test]
    fn test_older_pool_does_not_replace_newer() {
        let store = SnapshotStore::new();
        let now = Utc::now();
        let newer = store.publish(vec![Agent::new("a1", "Ada", SupportLevel::L1)], now);

        let version = store.publish(vec![], now - Duration::seconds(30));
        assert_eq!(version, newer);
        assert_eq!(store.load().agents.len(), 1);
        assert_eq!(store.last_successful_sync(), Some(now));
    }

    #[test]
    fn test_concurrent_publishers_get_distinct_versions() {
        let store = SnapshotStore::new();
        let now = Utc::now();

        let mut versions: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| (0..50).map(|_| store.publish(vec![], now)).collect::<Vec<_>>()))
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        versions.sort_unstable();
        versions.dedup();
        assert_eq!(versions.len(), 200);
        assert_eq!(store.load().version, 200);
    }

    #[test]
    fn test_held_snapshot_survives_publish() {
        let store = SnapshotStore::new();
        store.publish(vec![Agent::new("a1", "Ada", SupportLevel::L1)], Utc::now());
        let held = store.load();
        store.publish(vec![], Utc::now());
        assert_eq!(held.agents.len(), 1);
        assert!(store.load().agents.is_empty());
    }
}
