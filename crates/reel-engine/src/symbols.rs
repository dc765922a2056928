//! Symbol definitions, the symbol catalog and the entropy seam

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SpinError;

/// Opaque symbol identifier (e.g. "Cherry", "Bell")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

/// Source of uniform random draws.
///
/// Every random decision in the engine goes through this trait so tests can
/// script the exact draws. Any [`rand::Rng`] is an entropy source.
pub trait Entropy {
    /// Uniform value in `[0, 1)`
    fn unit(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;
}

impl<R: Rng + ?Sized> Entropy for R {
    fn unit(&mut self) -> f64 {
        self.random::<f64>()
    }

    fn index(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}

/// Fixed set of distinct symbols usable by reels and the outcome generator
///
/// Cheap to clone; reels and the generator share the same backing slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCatalog {
    symbols: Arc<[Symbol]>,
}

impl SymbolCatalog {
    /// Minimum catalog size for WIN/LOSE to mean anything
    pub const MIN_SYMBOLS: usize = 2;

    /// Build a catalog; fails on fewer than two symbols or duplicates
    pub fn new(symbols: impl IntoIterator<Item = Symbol>) -> Result<Self, SpinError> {
        let symbols: Vec<Symbol> = symbols.into_iter().collect();

        if symbols.is_empty() {
            return Err(SpinError::InvalidConfiguration(
                "symbol catalog is empty".into(),
            ));
        }
        if symbols.len() < Self::MIN_SYMBOLS {
            return Err(SpinError::InvalidConfiguration(format!(
                "symbol catalog needs at least {} symbols, got {}",
                Self::MIN_SYMBOLS,
                symbols.len()
            )));
        }

        let mut seen = HashSet::with_capacity(symbols.len());
        for symbol in &symbols {
            if symbol.as_str().trim().is_empty() {
                return Err(SpinError::InvalidConfiguration(
                    "symbol names cannot be blank".into(),
                ));
            }
            if !seen.insert(symbol) {
                return Err(SpinError::InvalidConfiguration(format!(
                    "duplicate symbol {symbol:?} in catalog"
                )));
            }
        }

        Ok(Self {
            symbols: symbols.into(),
        })
    }

    /// Build a catalog from symbol names
    pub fn from_names<I, S>(names: I) -> Result<Self, SpinError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Symbol::new))
    }

    /// Classic fruit-machine set
    pub fn classic() -> Self {
        Self {
            symbols: CLASSIC_SYMBOLS.iter().map(|&name| Symbol::new(name)).collect(),
        }
    }

    /// Uniform draw over the catalog
    pub fn pick_random<E: Entropy + ?Sized>(&self, entropy: &mut E) -> &Symbol {
        &self.symbols[entropy.index(self.symbols.len())]
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// Look a symbol up by name
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.as_str() == name)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self::classic()
    }
}

/// Symbol names of [`SymbolCatalog::classic`]
pub const CLASSIC_SYMBOLS: [&str; 5] = ["Cherry", "Lemon", "Bell", "Bar", "Seven"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEntropy;

    #[test]
    fn test_catalog_rejects_misconfiguration() {
        assert!(matches!(
            SymbolCatalog::from_names(Vec::<String>::new()),
            Err(SpinError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SymbolCatalog::from_names(["Cherry"]),
            Err(SpinError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SymbolCatalog::from_names(["Cherry", "Bell", "Cherry"]),
            Err(SpinError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SymbolCatalog::from_names(["Cherry", " "]),
            Err(SpinError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_pick_random_uses_entropy_index() {
        let catalog = SymbolCatalog::from_names(["Cherry", "Bell", "Bar"]).unwrap();
        let mut entropy = ScriptedEntropy::new().with_indices([2, 0, 1]);

        assert_eq!(catalog.pick_random(&mut entropy).as_str(), "Bar");
        assert_eq!(catalog.pick_random(&mut entropy).as_str(), "Cherry");
        assert_eq!(catalog.pick_random(&mut entropy).as_str(), "Bell");
    }

    #[test]
    fn test_pick_random_covers_catalog() {
        use rand::SeedableRng;

        let catalog = SymbolCatalog::classic();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(11);
        let mut counts = [0usize; CLASSIC_SYMBOLS.len()];

        for _ in 0..5_000 {
            let symbol = catalog.pick_random(&mut rng);
            let idx = CLASSIC_SYMBOLS
                .iter()
                .position(|&name| name == symbol.as_str())
                .unwrap();
            counts[idx] += 1;
        }

        // 1000 expected per symbol
        assert!(counts.iter().all(|&c| (800..1200).contains(&c)), "{counts:?}");
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = SymbolCatalog::classic();
        assert_eq!(catalog.len(), 5);
        assert!(catalog.contains(&Symbol::from("Seven")));
        assert!(!catalog.contains(&Symbol::from("Plum")));
        assert_eq!(catalog.get("Bell"), Some(&Symbol::from("Bell")));
    }
}
