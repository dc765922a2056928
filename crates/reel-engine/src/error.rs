//! Engine error taxonomy

use std::time::Duration;

/// Errors surfaced by configuration and outcome handling
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpinError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Outcome fetch failed: {0}")]
    OutcomeFetchFailure(#[from] FetchError),
}

/// Ways the outcome collaborator can fail a request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("no outcome within {0:?}")]
    Timeout(Duration),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("expected {expected} symbols, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("symbol {0:?} is not in the catalog")]
    UnknownSymbol(String),
}

/// Why a spin trigger had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TriggerRejected {
    #[error("a spin is already in progress")]
    InProgress,

    #[error("spin controller is not running")]
    Closed,
}
