//! Stage taxonomy - classification enums carried by stages

use std::fmt;

use serde::{Deserialize, Serialize};

/// Final classification of a resolved spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinVerdict {
    Win,
    Lose,
}

impl SpinVerdict {
    pub fn is_win(&self) -> bool {
        matches!(self, Self::Win)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Win => "WIN",
            Self::Lose => "LOSE",
        }
    }
}

impl fmt::Display for SpinVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Why a session ended without a resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AbortReason {
    /// Cancelled through the controller handle
    Cancelled,
    /// Outcome source did not answer in time
    Timeout,
    /// Outcome source rejected the request or answered garbage
    FetchFailed(String),
    /// Controller is shutting down
    Shutdown,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::Timeout => f.write_str("outcome timeout"),
            Self::FetchFailed(detail) => write!(f, "outcome fetch failed: {detail}"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}
