//! Timing profiles and the per-reel stagger plan

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingProfile {
    /// Standard gameplay timing
    Normal,
    /// Fast/Turbo mode
    Turbo,
    /// Studio mode (near-instant, for automated runs)
    Studio,
    /// Hand-tuned or scaled values
    Custom,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self::Normal
    }
}

/// Detailed timing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Profile type
    pub profile: TimingProfile,

    /// Interval between cosmetic ticks of one reel (ms)
    pub tick_interval_ms: u64,

    /// Ticks reel 0 runs before locking
    pub base_cycles: u32,

    /// Extra ticks per reel index (left-to-right stagger)
    pub step_cycles: u32,

    /// Pause between the last lock and the resolution event (ms)
    pub settle_delay_ms: u64,

    /// Time after resolution before a new spin may be triggered (ms)
    pub cooldown_ms: u64,
}

impl TimingConfig {
    /// Standard timing: 50 ms ticks, 20 + 5·i cycles, 1.2 s cooldown
    pub fn normal() -> Self {
        Self {
            profile: TimingProfile::Normal,
            tick_interval_ms: 50,
            base_cycles: 20,
            step_cycles: 5,
            settle_delay_ms: 100,
            cooldown_ms: 1200,
        }
    }

    /// Turbo mode
    pub fn turbo() -> Self {
        Self {
            profile: TimingProfile::Turbo,
            tick_interval_ms: 30,
            base_cycles: 12,
            step_cycles: 3,
            settle_delay_ms: 50,
            cooldown_ms: 500,
        }
    }

    /// Studio mode (a spin completes in a few milliseconds)
    pub fn studio() -> Self {
        Self {
            profile: TimingProfile::Studio,
            tick_interval_ms: 1,
            base_cycles: 3,
            step_cycles: 1,
            settle_delay_ms: 0,
            cooldown_ms: 0,
        }
    }

    /// Get config for profile
    pub fn from_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Normal => Self::normal(),
            TimingProfile::Turbo => Self::turbo(),
            TimingProfile::Studio => Self::studio(),
            TimingProfile::Custom => Self {
                profile: TimingProfile::Custom,
                ..Self::normal()
            },
        }
    }

    /// Scale every duration by factor (< 1.0 = faster). Cycle counts are kept.
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |ms: u64| (ms as f64 * factor).round().max(0.0) as u64;
        Self {
            profile: TimingProfile::Custom,
            tick_interval_ms: scale(self.tick_interval_ms).max(1),
            base_cycles: self.base_cycles,
            step_cycles: self.step_cycles,
            settle_delay_ms: scale(self.settle_delay_ms),
            cooldown_ms: scale(self.cooldown_ms),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Per-reel cycle plan
    pub fn stagger(&self) -> StaggerPlan {
        StaggerPlan {
            base_cycles: self.base_cycles,
            step_cycles: self.step_cycles,
        }
    }

    /// Time from animation start until reel `reel_index` locks
    pub fn lock_time(&self, reel_index: usize) -> Duration {
        self.tick_interval() * self.stagger().total_cycles(reel_index)
    }

    /// Time from animation start until the last of `reel_count` reels locks
    pub fn total_spin_duration(&self, reel_count: usize) -> Duration {
        self.lock_time(reel_count.saturating_sub(1))
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::normal()
    }
}

/// Per-reel total tick count: `base_cycles + reel_index * step_cycles`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaggerPlan {
    pub base_cycles: u32,
    pub step_cycles: u32,
}

impl StaggerPlan {
    pub fn total_cycles(&self, reel_index: usize) -> u32 {
        let index = u32::try_from(reel_index).unwrap_or(u32::MAX);
        self.base_cycles
            .saturating_add(index.saturating_mul(self.step_cycles))
    }
}
