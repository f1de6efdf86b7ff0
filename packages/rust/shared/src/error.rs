//! Error types for ARRS.
//!
//! Every library crate returns [`ArrsError`]. The orchestrator inspects
//! [`ArrsError::kind`] to decide whether a failed stage aborts the run or is
//! absorbed.

use std::path::PathBuf;

/// Top-level error type for all ARRS operations.
#[derive(Debug, thiserror::Error)]
pub enum ArrsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Every fetch strategy failed for a URL.
    #[error("acquisition error: {0}")]
    Acquisition(String),

    /// Markup could not be normalized into parsed content.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// One scoring engine failed.
    #[error("engine error ({engine}): {message}")]
    Engine { engine: String, message: String },

    /// AI simulation backend unreachable or returned a malformed response.
    #[error("simulation error: {0}")]
    Simulation(String),

    /// Database or storage layer error.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, illegal status transition, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ArrsError>;

/// Coarse classification of an [`ArrsError`], used for stage policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Acquisition,
    Extraction,
    Engine,
    Simulation,
    Persistence,
    Io,
    Validation,
}

impl ArrsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create an engine error attributed to `engine`.
    pub fn engine(engine: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Engine {
            engine: engine.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::Acquisition(_) => ErrorKind::Acquisition,
            Self::Extraction { .. } => ErrorKind::Extraction,
            Self::Engine { .. } => ErrorKind::Engine,
            Self::Simulation(_) => ErrorKind::Simulation,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Io { .. } => ErrorKind::Io,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// Whether this error ends an analysis run.
    ///
    /// Engine failures only drop that engine's contribution and simulation
    /// failures only skip the simulation step; everything else is terminal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Engine | ErrorKind::Simulation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ArrsError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ArrsError::engine("ARCE", "division by zero");
        assert_eq!(err.to_string(), "engine error (ARCE): division by zero");

        let err = ArrsError::Acquisition("Failed to crawl https://x.test: timeout".into());
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn stage_policy_by_kind() {
        assert!(ArrsError::Acquisition("x".into()).is_fatal());
        assert!(ArrsError::extraction("x").is_fatal());
        assert!(ArrsError::Persistence("x".into()).is_fatal());
        assert!(!ArrsError::engine("ADE", "x").is_fatal());
        assert!(!ArrsError::Simulation("x".into()).is_fatal());
        assert_eq!(ArrsError::validation("x").kind(), ErrorKind::Validation);
    }
}
