//! Error types for the CLI.

use routewise_core::RoutewiseError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Routewise(#[from] RoutewiseError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
    #[error("failed to install tracing subscriber: {reason}")]
    Telemetry { reason: String },
}

pub type CliResult<T> = Result<T, CliError>;
