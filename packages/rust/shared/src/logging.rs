//! Tracing subscriber setup for applications embedding ARRS.

use serde::{Deserialize, Serialize};

use crate::error::{ArrsError, Result};

/// Output format for log events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Default filter directive for a verbosity level (0 = info, 1 = debug, 2+ = trace).
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "arrs=info",
        1 => "arrs=debug",
        _ => "arrs=trace",
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides `verbosity`.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(format: LogFormat, verbosity: u8) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let installed = match format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init(),
        LogFormat::Json => fmt().json().with_env_filter(env_filter).try_init(),
    };

    installed.map_err(|e| ArrsError::config(format!("failed to install tracing subscriber: {e}")))
}
