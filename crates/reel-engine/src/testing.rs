//! Scripted entropy for forcing RNG draws in unit tests

use std::collections::VecDeque;

use crate::symbols::Entropy;

/// Replays queued draws; panics when a queue runs dry
#[derive(Debug, Default)]
pub(crate) struct ScriptedEntropy {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
}

impl ScriptedEntropy {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    pub(crate) fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices.extend(indices);
        self
    }
}

impl Entropy for ScriptedEntropy {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().expect("scripted unit draws exhausted")
    }

    fn index(&mut self, len: usize) -> usize {
        let index = self
            .indices
            .pop_front()
            .expect("scripted index draws exhausted");
        assert!(index < len, "scripted index {index} out of range for {len}");
        index
    }
}
