//! Hot-reloadable configuration store
//!
//! Readers take an `Arc<EngineConfig>` once per decision pass; a reload
//! swaps the pointer and never touches a config a pass is holding.

use crate::{EngineConfig, RoutewiseResult};
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lock-free holder of the live engine configuration.
pub struct ConfigStore {
    current: ArcSwap<EngineConfig>,
    version: AtomicU64,
}

impl ConfigStore {
    /// Create a store from a candidate config, preparing it first.
    pub fn new(config: EngineConfig) -> RoutewiseResult<Self> {
        let prepared = config.prepare()?;
        Ok(Self {
            current: ArcSwap::from_pointee(prepared),
            version: AtomicU64::new(1),
        })
    }

    /// Snapshot of the live config.
    pub fn current(&self) -> Arc<EngineConfig> {
        self.current.load_full()
    }

    /// Number of successful loads, starting at 1.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Validate and swap in a new config.
    ///
    /// On error the live config is left untouched and keeps serving.
    pub fn reload(&self, candidate: EngineConfig) -> RoutewiseResult<u64> {
        match candidate.prepare() {
            Ok(prepared) => {
                self.current.store(Arc::new(prepared));
                let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
                tracing::info!(version, "Engine configuration reloaded");
                Ok(version)
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    version = self.version(),
                    "Rejected configuration reload, keeping last valid config"
                );
                Err(err)
            }
        }
    }

    /// Reload from a TOML file.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> RoutewiseResult<u64> {
        match EngineConfig::load_file(path.as_ref()) {
            Ok(config) => self.reload(config),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %path.as_ref().display(),
                    "Failed to load configuration file, keeping last valid config"
                );
                Err(err)
            }
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(EngineConfig::default().normalized()),
            version: AtomicU64::new(1),
        }
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("version", &self.version())
            .finish()
    }
}
