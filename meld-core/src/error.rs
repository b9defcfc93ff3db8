//! Error types.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while waiting on a holder or loading configuration.
///
/// Combinators themselves never fail; only the awaiting side has failure
/// modes.
#[derive(Debug, Error)]
pub enum MeldError {
    /// The holder was dropped before it emitted.
    #[error("source was dropped before emitting")]
    SourceClosed,

    /// No emission arrived within the configured timeout.
    #[error("no emission within {after:?}")]
    Timeout { after: Duration },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MeldError>;
