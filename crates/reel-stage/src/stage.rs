//! Stage - every observable moment of a spin
//!
//! A Stage is NOT an animation. It is the meaning of a moment in the spin
//! flow; the presentation layer decides how it looks and sounds.

use serde::{Deserialize, Serialize};

use crate::taxonomy::{AbortReason, SpinVerdict};

/// Observable moment of a spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    // ═══════════════════════════════════════════════════════════════════════
    // SESSION LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Trigger accepted, outcome requested from the server collaborator
    SpinRequested {
        reel_count: u8,
    },

    /// Trigger arrived while a spin (or its cooldown) was active
    TriggerIgnored,

    /// Authoritative outcome arrived; reels are about to cycle
    OutcomeReceived {
        symbols: Vec<String>,
    },

    /// Every reel locked; carries the verdict. Fires once per spin.
    Resolved {
        verdict: SpinVerdict,
        outcome: Vec<String>,
    },

    /// Session ended without a resolution
    Aborted {
        reason: AbortReason,
    },

    /// Cooldown elapsed, the trigger may be shown again
    SpinAvailable,

    // ═══════════════════════════════════════════════════════════════════════
    // REELS
    // ═══════════════════════════════════════════════════════════════════════
    /// Reel started cycling
    ReelSpinning {
        reel_index: u8,
        /// Ticks this reel will run before locking
        total_cycles: u32,
    },

    /// Cosmetic tick: render this symbol, it is not the final value
    ReelTick {
        reel_index: u8,
        symbol: String,
    },

    /// Reel stopped on its authoritative symbol
    ReelLocked {
        reel_index: u8,
        symbol: String,
    },
}

impl Stage {
    /// Get the category of this stage
    pub fn category(&self) -> StageCategory {
        match self {
            Stage::SpinRequested { .. }
            | Stage::TriggerIgnored
            | Stage::OutcomeReceived { .. }
            | Stage::SpinAvailable => StageCategory::Lifecycle,

            Stage::ReelSpinning { .. } | Stage::ReelTick { .. } | Stage::ReelLocked { .. } => {
                StageCategory::Reel
            }

            Stage::Resolved { .. } | Stage::Aborted { .. } => StageCategory::Result,
        }
    }

    /// Get stage type name (snake_case, matches the serde tag)
    pub fn type_name(&self) -> &'static str {
        match self {
            Stage::SpinRequested { .. } => "spin_requested",
            Stage::TriggerIgnored => "trigger_ignored",
            Stage::OutcomeReceived { .. } => "outcome_received",
            Stage::Resolved { .. } => "resolved",
            Stage::Aborted { .. } => "aborted",
            Stage::SpinAvailable => "spin_available",
            Stage::ReelSpinning { .. } => "reel_spinning",
            Stage::ReelTick { .. } => "reel_tick",
            Stage::ReelLocked { .. } => "reel_locked",
        }
    }

    /// Reel index for per-reel stages
    pub fn reel_index(&self) -> Option<u8> {
        match self {
            Stage::ReelSpinning { reel_index, .. }
            | Stage::ReelTick { reel_index, .. }
            | Stage::ReelLocked { reel_index, .. } => Some(*reel_index),
            _ => None,
        }
    }

    /// Does this stage end the session (resolution or abort)?
    pub fn is_terminal(&self) -> bool {
        matches!(self.category(), StageCategory::Result)
    }
}

/// Stage grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    Lifecycle,
    Reel,
    Result,
}
