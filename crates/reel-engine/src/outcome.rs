//! Outcome generation - the authoritative final symbols of a spin

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::SpinError;
use crate::evaluator::evaluate;
use crate::symbols::{Entropy, Symbol, SymbolCatalog};
use reel_stage::SpinVerdict;

/// Default probability of the forced-win branch
pub const FORCED_WIN_PROBABILITY: f64 = 0.25;

/// Authoritative final symbol per reel, fixed before any reel cycles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outcome(Vec<Symbol>);

impl Outcome {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self(symbols)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    pub fn get(&self, reel_index: usize) -> Option<&Symbol> {
        self.0.get(reel_index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Symbol names, for stage payloads
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|s| s.as_str().to_owned()).collect()
    }
}

impl Index<usize> for Outcome {
    type Output = Symbol;

    fn index(&self, reel_index: usize) -> &Symbol {
        &self.0[reel_index]
    }
}

impl From<Vec<Symbol>> for Outcome {
    fn from(symbols: Vec<Symbol>) -> Self {
        Self(symbols)
    }
}

/// Weighted outcome policy
///
/// With probability `forced_win_probability` one symbol is drawn and
/// repeated on every reel. Otherwise each reel draws independently, so a
/// natural match is still possible.
#[derive(Debug, Clone)]
pub struct OutcomeGenerator {
    catalog: SymbolCatalog,
    forced_win_probability: f64,
}

impl OutcomeGenerator {
    /// Generator with the default 25% forced-win branch
    pub fn new(catalog: SymbolCatalog) -> Self {
        Self {
            catalog,
            forced_win_probability: FORCED_WIN_PROBABILITY,
        }
    }

    /// Override the forced-win probability (must lie in `[0, 1]`)
    pub fn with_forced_win_probability(mut self, probability: f64) -> Result<Self, SpinError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(SpinError::InvalidConfiguration(format!(
                "forced win probability {probability} outside [0, 1]"
            )));
        }
        self.forced_win_probability = probability;
        Ok(self)
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    pub fn forced_win_probability(&self) -> f64 {
        self.forced_win_probability
    }

    /// Draw the final symbols for `reel_count` reels
    pub fn generate<E: Entropy + ?Sized>(
        &self,
        reel_count: usize,
        entropy: &mut E,
    ) -> Result<Outcome, SpinError> {
        if reel_count < 1 {
            return Err(SpinError::InvalidConfiguration(
                "reel count must be at least 1".into(),
            ));
        }
        if self.catalog.is_empty() {
            return Err(SpinError::InvalidConfiguration(
                "symbol catalog is empty".into(),
            ));
        }

        let roll = entropy.unit();
        let symbols = if roll < self.forced_win_probability {
            let symbol = self.catalog.pick_random(entropy).clone();
            vec![symbol; reel_count]
        } else {
            (0..reel_count)
                .map(|_| self.catalog.pick_random(entropy).clone())
                .collect()
        };

        log::trace!("[Outcome] roll={roll:.3} symbols={symbols:?}");
        Ok(Outcome(symbols))
    }

    /// Long-run WIN rate: forced branch plus natural matches in the rest
    pub fn expected_win_rate(&self, reel_count: usize) -> f64 {
        let exponent = reel_count.saturating_sub(1) as i32;
        let natural = 1.0 / (self.catalog.len() as f64).powi(exponent);
        self.forced_win_probability + (1.0 - self.forced_win_probability) * natural
    }

    /// Run `spins` outcomes through the evaluator and tally the verdicts
    pub fn simulate<E: Entropy + ?Sized>(
        &self,
        reel_count: usize,
        spins: u64,
        entropy: &mut E,
    ) -> Result<SimulationReport, SpinError> {
        let mut wins = 0u64;
        for _ in 0..spins {
            let outcome = self.generate(reel_count, entropy)?;
            if evaluate(outcome.symbols()) == SpinVerdict::Win {
                wins += 1;
            }
        }

        Ok(SimulationReport {
            spins,
            wins,
            reel_count,
            catalog_size: self.catalog.len(),
            expected_win_rate: self.expected_win_rate(reel_count),
        })
    }
}

/// Result of a batch outcome simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub spins: u64,
    pub wins: u64,
    pub reel_count: usize,
    pub catalog_size: usize,
    pub expected_win_rate: f64,
}

impl SimulationReport {
    /// Observed hit rate
    pub fn win_rate(&self) -> f64 {
        if self.spins == 0 {
            0.0
        } else {
            self.wins as f64 / self.spins as f64
        }
    }

    pub fn losses(&self) -> u64 {
        self.spins - self.wins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEntropy;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fruit_generator() -> OutcomeGenerator {
        OutcomeGenerator::new(SymbolCatalog::from_names(["Cherry", "Bell", "Bar"]).unwrap())
    }

    #[test]
    fn test_forced_win_branch() {
        // roll 0.1 < 0.25, single symbol draw = Bell
        let mut entropy = ScriptedEntropy::new().with_units([0.1]).with_indices([1]);
        let outcome = fruit_generator().generate(3, &mut entropy).unwrap();

        assert_eq!(outcome.names(), vec!["Bell", "Bell", "Bell"]);
        assert_eq!(evaluate(outcome.symbols()), SpinVerdict::Win);
    }

    #[test]
    fn test_independent_branch() {
        // roll 0.9, per-reel draws Cherry, Bell, Bar
        let mut entropy = ScriptedEntropy::new().with_units([0.9]).with_indices([0, 1, 2]);
        let outcome = fruit_generator().generate(3, &mut entropy).unwrap();

        assert_eq!(outcome.names(), vec!["Cherry", "Bell", "Bar"]);
        assert_eq!(evaluate(outcome.symbols()), SpinVerdict::Lose);
    }

    #[test]
    fn test_roll_at_threshold_is_independent() {
        let mut entropy = ScriptedEntropy::new().with_units([0.25]).with_indices([2, 2, 0]);
        let outcome = fruit_generator().generate(3, &mut entropy).unwrap();

        assert_eq!(outcome.names(), vec!["Bar", "Bar", "Cherry"]);
    }

    #[test]
    fn test_outcome_length_and_membership() {
        let generator = fruit_generator();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for reel_count in 1..=6 {
            for _ in 0..200 {
                let outcome = generator.generate(reel_count, &mut rng).unwrap();
                assert_eq!(outcome.len(), reel_count);
                assert!(outcome.symbols().iter().all(|s| generator.catalog().contains(s)));
            }
        }
    }

    #[test]
    fn test_zero_reels_is_invalid() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(matches!(
            fruit_generator().generate(0, &mut rng),
            Err(SpinError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_forced_probability_bounds() {
        assert!(fruit_generator().with_forced_win_probability(1.5).is_err());
        assert!(fruit_generator().with_forced_win_probability(-0.1).is_err());
        assert!(fruit_generator().with_forced_win_probability(0.0).is_ok());
    }

    #[test]
    fn test_expected_win_rate() {
        let generator = fruit_generator();
        // 0.25 + 0.75 / 9
        assert!((generator.expected_win_rate(3) - (0.25 + 0.75 / 9.0)).abs() < 1e-12);
        assert_eq!(generator.expected_win_rate(1), 1.0);
    }

    #[test]
    fn test_win_rate_over_large_sample() {
        let generator = fruit_generator();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let report = generator.simulate(3, 20_000, &mut rng).unwrap();

        // Forced branch alone guarantees 0.25; natural matches add ~0.083.
        assert!(report.win_rate() >= 0.31, "win rate {}", report.win_rate());
        assert!(
            (report.win_rate() - report.expected_win_rate).abs() < 0.02,
            "observed {} expected {}",
            report.win_rate(),
            report.expected_win_rate
        );
        assert_eq!(report.wins + report.losses(), 20_000);
    }
}
