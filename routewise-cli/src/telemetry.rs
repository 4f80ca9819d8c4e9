//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise the library crates log at info and
//! the engine at debug.

use crate::error::{CliError, CliResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str =
    "routewise=info,routewise_sync=info,routewise_core=info,routewise_engine=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber. Logs go to stderr so decision JSON on
/// stdout stays machine readable.
pub fn init_tracing(json: bool) -> CliResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::Telemetry { reason: e.to_string() })?;

    tracing::debug!(json, "Telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_second_init_is_telemetry_error() {
        // The first call may lose to another test installing a subscriber
        let _ = init_tracing(false);
        assert!(matches!(init_tracing(true), Err(CliError::Telemetry { .. })));
    }

    #[test]
    fn test_env_filter_selection() {
        {
            let _guard = EnvVarGuard::set("RUST_LOG", None);
            let filter = env_filter().to_string();
            assert!(filter.contains("routewise_engine=debug"));
            assert!(filter.contains("routewise_sync=info"));
        }
        {
            let _guard = EnvVarGuard::set("RUST_LOG", Some("warn"));
            assert_eq!(env_filter().to_string(), "warn");
        }
    }
}
