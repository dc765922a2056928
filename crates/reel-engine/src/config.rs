//! Engine configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SpinError;
use crate::outcome::{FORCED_WIN_PROBABILITY, OutcomeGenerator};
use crate::server::LatencyRange;
use crate::symbols::{CLASSIC_SYMBOLS, SymbolCatalog};
use crate::timing::TimingConfig;

/// Largest supported reel row
pub const MAX_REELS: usize = 32;

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    /// Number of reels
    pub reel_count: usize,

    /// Symbol catalog, by name
    pub symbols: Vec<String>,

    /// Probability of the forced all-equal branch
    pub forced_win_probability: f64,

    /// Reel and session timing
    pub timing: TimingConfig,

    /// Mock server round-trip
    pub latency: LatencyRange,

    /// Abort the spin if the outcome takes longer than this (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_timeout_ms: Option<u64>,

    /// Seed for reproducible runs (None = OS entropy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            reel_count: 3,
            symbols: CLASSIC_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            forced_win_probability: FORCED_WIN_PROBABILITY,
            timing: TimingConfig::normal(),
            latency: LatencyRange::default(),
            outcome_timeout_ms: None,
            seed: None,
        }
    }
}

impl SpinConfig {
    /// Config with instant server and studio timing (automated runs)
    pub fn studio() -> Self {
        Self {
            timing: TimingConfig::studio(),
            latency: LatencyRange::instant(),
            ..Self::default()
        }
    }

    /// Builder: set symbols
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set reel count
    pub fn with_reel_count(mut self, reel_count: usize) -> Self {
        self.reel_count = reel_count;
        self
    }

    /// Builder: set timing
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Builder: set seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn outcome_timeout(&self) -> Option<Duration> {
        self.outcome_timeout_ms.map(Duration::from_millis)
    }

    /// Check every constraint the engine relies on
    pub fn validate(&self) -> Result<(), SpinError> {
        let invalid = |msg: String| -> Result<(), SpinError> { Err(SpinError::InvalidConfiguration(msg)) };

        if self.reel_count < 1 || self.reel_count > MAX_REELS {
            return invalid(format!(
                "reel count must be in 1..={MAX_REELS}, got {}",
                self.reel_count
            ));
        }
        if !(0.0..=1.0).contains(&self.forced_win_probability) {
            return invalid(format!(
                "forced win probability {} outside [0, 1]",
                self.forced_win_probability
            ));
        }
        if self.timing.tick_interval_ms == 0 {
            return invalid("tick interval must be positive".into());
        }
        if self.timing.base_cycles == 0 {
            return invalid("base cycles must be at least 1".into());
        }
        if self.timing.step_cycles == 0 {
            return invalid("step cycles must be at least 1 so reels stop in order".into());
        }
        if self.latency.min_ms > self.latency.max_ms {
            return invalid(format!(
                "latency min {} ms exceeds max {} ms",
                self.latency.min_ms, self.latency.max_ms
            ));
        }
        if !self.latency.is_valid() {
            return invalid(format!(
                "latency max {} ms exceeds the {} ms ceiling",
                self.latency.max_ms,
                LatencyRange::MAX_MS
            ));
        }
        if self.outcome_timeout_ms == Some(0) {
            return invalid("outcome timeout must be positive".into());
        }

        self.catalog().map(|_| ())
    }

    /// Build the symbol catalog
    pub fn catalog(&self) -> Result<SymbolCatalog, SpinError> {
        SymbolCatalog::from_names(self.symbols.iter().cloned())
    }

    /// Build the outcome generator
    pub fn generator(&self) -> Result<OutcomeGenerator, SpinError> {
        OutcomeGenerator::new(self.catalog()?).with_forced_win_probability(self.forced_win_probability)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, SpinError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SpinError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, SpinError> {
        let config: Self =
            serde_yml::from_str(yaml).map_err(|e| SpinError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SpinError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SpinError::ConfigParse(format!("{}: {e}", path.display())))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            other => Err(SpinError::ConfigParse(format!(
                "unsupported config extension {other:?} for {}",
                path.display()
            ))),
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, SpinError> {
        serde_json::to_string_pretty(self).map_err(|e| SpinError::ConfigParse(e.to_string()))
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, SpinError> {
        serde_yml::to_string(self).map_err(|e| SpinError::ConfigParse(e.to_string()))
    }
}
