//! Subcommand implementations

use crate::error::CliResult;
use routewise_core::{
    Agent, AgentDirectory, ConfigError, ConfigStore, Decision, EngineConfig, RoutewiseResult,
    SnapshotStore, Ticket, TicketId,
};
use routewise_engine::DecisionEngine;
use routewise_sync::{
    HttpSyncClient, HttpTicketingClient, ResilientExecutor, ResilientSyncClient, SyncService,
    SyncSettings, UpstreamApi,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// How often the daemon checks the config file for changes.
pub const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(5);

// ============================================================================
// INPUT
// ============================================================================

fn read_file(path: &Path) -> RoutewiseResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Read and deserialize a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> RoutewiseResult<T> {
    let raw = read_file(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        ConfigError::Parse {
            reason: format!("{}: {}", path.display(), e),
        }
        .into()
    })
}

/// Config store from a TOML file, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> RoutewiseResult<ConfigStore> {
    match path {
        Some(path) => {
            let config = EngineConfig::load_file(path)?;
            tracing::info!(path = %path.display(), "Loaded engine configuration");
            ConfigStore::new(config)
        }
        None => Ok(ConfigStore::default()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// SIMULATE / CHECK-CONFIG
// ============================================================================

/// Route one ticket against a local agent list treated as freshly synced.
pub fn simulate(config: Option<&Path>, agents: &Path, ticket: &Path) -> RoutewiseResult<Decision> {
    let store = Arc::new(load_config(config)?);
    let agents: Vec<Agent> = read_json(agents)?;
    let ticket: Ticket = read_json(ticket)?;

    let snapshots = Arc::new(SnapshotStore::new());
    snapshots.publish(agents, chrono::Utc::now());

    let engine = DecisionEngine::new(store, snapshots);
    Ok(engine.decide(&ticket))
}

pub fn run_simulate(config: Option<&Path>, agents: &Path, ticket: &Path) -> CliResult<()> {
    let decision = simulate(config, agents, ticket)?;
    print_json(&decision)
}

pub fn run_check_config(path: &Path) -> CliResult<()> {
    let config = EngineConfig::load_file(path)?;
    print_json(&config)
}

// ============================================================================
// UPSTREAM
// ============================================================================

fn http_client(settings: &SyncSettings, config: Arc<ConfigStore>) -> RoutewiseResult<Arc<HttpSyncClient>> {
    let api = HttpTicketingClient::new(settings.upstream_url.clone(), settings.upstream_token.clone())?;
    let executor = ResilientExecutor::from_config_store(config);
    Ok(Arc::new(ResilientSyncClient::new(api, executor)))
}

/// Sync once, route the ticket, and push the result upstream if it was
/// routed.
pub async fn run_route(config: Option<&Path>, ticket_id: TicketId) -> CliResult<()> {
    let settings = SyncSettings::from_env();
    tracing::debug!(?settings, "Upstream settings");

    let store = Arc::new(load_config(config)?);
    let client = http_client(&settings, store.clone())?;
    let snapshots = Arc::new(SnapshotStore::new());

    // A failed sync still lets the engine answer; the decision is marked stale
    let service = SyncService::new(client.clone(), snapshots.clone());
    let _ = service.sync_once().await;

    let engine = DecisionEngine::new(store, snapshots);
    let directory: &dyn AgentDirectory = client.as_ref();
    let decision = engine.decide_by_id(directory, &ticket_id).await?;
    client.push_decision(&decision).await?;
    print_json(&decision)
}

// ============================================================================
// SYNC DAEMON
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

fn stamp(path: &Path) -> Option<FileStamp> {
    let metadata = std::fs::metadata(path).ok()?;
    Some(FileStamp {
        modified: metadata.modified().ok(),
        len: metadata.len(),
    })
}

/// Reloads the config store whenever the watched file changes.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_seen: Option<FileStamp>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_seen = stamp(&path);
        Self { path, last_seen }
    }

    /// Reload if the file changed since the last poll. `None` when nothing
    /// changed or the file is missing.
    pub fn poll(&mut self, store: &ConfigStore) -> Option<RoutewiseResult<u64>> {
        let current = stamp(&self.path)?;
        if self.last_seen == Some(current) {
            return None;
        }
        self.last_seen = Some(current);
        Some(store.reload_from_file(&self.path))
    }

    pub async fn run(mut self, store: Arc<ConfigStore>, every: Duration, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // Rejections are logged by the store
                    let _ = self.poll(&store);
                }
            }
        }
    }
}

async fn route_one<A: UpstreamApi>(
    engine: &DecisionEngine,
    client: &ResilientSyncClient<A>,
    ticket_id: &TicketId,
) -> RoutewiseResult<Decision> {
    let decision = engine.decide_by_id(client, ticket_id).await?;
    client.push_decision(&decision).await?;
    // Overrides go through the upstream UI once the decision is pushed
    engine.forget(ticket_id);
    Ok(decision)
}

/// Route ticket ids read one per line against the live snapshot, pushing
/// each routed decision upstream and writing it to `output` as a JSON line.
///
/// Blank lines are skipped. A ticket that fails to route is logged and
/// skipped. Stops at end of input or on shutdown and returns the number of
/// tickets routed.
pub async fn route_lines<A, R, W>(
    engine: &DecisionEngine,
    client: &ResilientSyncClient<A>,
    input: R,
    mut output: W,
    mut shutdown_rx: watch::Receiver<bool>,
) -> CliResult<u64>
where
    A: UpstreamApi,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut routed = 0;

    loop {
        let line = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let ticket_id = line.trim();
        if ticket_id.is_empty() {
            continue;
        }

        let ticket_id = TicketId::from(ticket_id);
        match route_one(engine, client, &ticket_id).await {
            Ok(decision) => {
                let mut rendered = serde_json::to_vec(&decision)?;
                rendered.push(b'\n');
                output.write_all(&rendered).await?;
                output.flush().await?;
                routed += 1;
            }
            Err(err) => {
                tracing::warn!(ticket_id = %ticket_id, error = %err, "Failed to route ticket");
            }
        }
    }

    tracing::info!(routed, "Ticket router stopped");
    Ok(routed)
}

/// Keep the agent pool snapshot current until Ctrl-C.
///
/// With `route_stdin`, ticket ids on stdin are routed against the synced
/// pool as they arrive. Reading stdin cannot be cancelled, so after Ctrl-C
/// the process may wait for one more line or end of input before exiting.
pub async fn run_sync(config: Option<PathBuf>, interval_secs: Option<u64>, route_stdin: bool) -> CliResult<()> {
    let mut settings = SyncSettings::from_env();
    if let Some(secs) = interval_secs.filter(|secs| *secs > 0) {
        settings.sync_interval = Duration::from_secs(secs);
    }
    tracing::info!(?settings, "Starting agent pool sync daemon");

    let store = Arc::new(load_config(config.as_deref())?);
    let client = http_client(&settings, store.clone())?;
    let snapshots = Arc::new(SnapshotStore::new());
    let service = Arc::new(SyncService::new(client.clone(), snapshots.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let router = route_stdin.then(|| {
        let engine = DecisionEngine::new(store.clone(), snapshots.clone());
        let client = client.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let input = BufReader::new(tokio::io::stdin());
            route_lines(&engine, client.as_ref(), input, tokio::io::stdout(), shutdown_rx).await
        })
    });

    let watcher = config.map(|path| {
        let watcher = ConfigWatcher::new(path);
        tokio::spawn(watcher.run(store.clone(), CONFIG_POLL_INTERVAL, shutdown_rx.clone()))
    });

    let runner = service.clone();
    let every = settings.sync_interval;
    let sync_task = tokio::spawn(async move { runner.run(every, shutdown_rx).await });

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
    let _ = shutdown_tx.send(true);

    if let Ok(metrics) = sync_task.await {
        tracing::info!(
            syncs_succeeded = metrics.syncs_succeeded,
            syncs_failed = metrics.syncs_failed,
            "Sync daemon stopped"
        );
    }
    if let Some(handle) = watcher {
        let _ = handle.await;
    }
    if let Some(handle) = router {
        match handle.await {
            Ok(result) => {
                result?;
            }
            Err(e) => tracing::error!(error = %e, "Ticket router task failed"),
        }
    }
    Ok(())
}
