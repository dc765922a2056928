//! Reels and their cycling timelines

use serde::{Deserialize, Serialize};

use crate::symbols::{Entropy, Symbol, SymbolCatalog};
use crate::timing::StaggerPlan;

/// Reel lifecycle within one spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReelState {
    Idle,
    Cycling,
    Locked,
}

/// One spinning column
///
/// Reels are reused across spins: Idle → Cycling → Locked once per spin,
/// then reset to Idle. The displayed symbol survives the reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reel {
    index: usize,
    current_symbol: Symbol,
    state: ReelState,
}

impl Reel {
    pub fn new(index: usize, initial_symbol: Symbol) -> Self {
        Self {
            index,
            current_symbol: initial_symbol,
            state: ReelState::Idle,
        }
    }

    /// A row of reels showing random symbols
    pub fn row<E: Entropy + ?Sized>(
        count: usize,
        catalog: &SymbolCatalog,
        entropy: &mut E,
    ) -> Vec<Reel> {
        (0..count)
            .map(|index| Reel::new(index, catalog.pick_random(entropy).clone()))
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_symbol(&self) -> &Symbol {
        &self.current_symbol
    }

    pub fn state(&self) -> ReelState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == ReelState::Locked
    }

    pub(crate) fn start_cycling(&mut self) {
        assert_eq!(
            self.state,
            ReelState::Idle,
            "reel {} started cycling from {:?}",
            self.index,
            self.state
        );
        self.state = ReelState::Cycling;
    }

    /// Display a cosmetic symbol
    pub(crate) fn show(&mut self, symbol: Symbol) {
        assert_eq!(
            self.state,
            ReelState::Cycling,
            "reel {} ticked while {:?}",
            self.index,
            self.state
        );
        self.current_symbol = symbol;
    }

    /// Display the authoritative symbol and stop
    pub(crate) fn lock(&mut self, symbol: Symbol) {
        assert_eq!(
            self.state,
            ReelState::Cycling,
            "reel {} locked while {:?}",
            self.index,
            self.state
        );
        self.current_symbol = symbol;
        self.state = ReelState::Locked;
    }

    pub(crate) fn reset(&mut self) {
        self.state = ReelState::Idle;
    }
}

/// What a timeline tick produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReelTick {
    /// Cosmetic symbol; not the final value
    Cycle(Symbol),
    /// Final tick: the authoritative symbol. No ticks follow.
    Lock(Symbol),
}

impl ReelTick {
    pub fn symbol(&self) -> &Symbol {
        match self {
            ReelTick::Cycle(symbol) | ReelTick::Lock(symbol) => symbol,
        }
    }

    pub fn is_lock(&self) -> bool {
        matches!(self, ReelTick::Lock(_))
    }
}

/// Clock-free schedule of one reel's ticks
///
/// The reel runs `total_cycles` ticks. Every tick before the last draws a
/// cosmetic symbol; the tick that brings the counter to `total_cycles`
/// yields the final symbol instead. The driver owns the clock.
#[derive(Debug, Clone)]
pub struct ReelTimeline {
    reel_index: usize,
    final_symbol: Symbol,
    total_cycles: u32,
    cycles: u32,
    locked: bool,
}

impl ReelTimeline {
    pub fn new(reel_index: usize, final_symbol: Symbol, plan: &StaggerPlan) -> Self {
        let total_cycles = plan.total_cycles(reel_index);
        assert!(total_cycles >= 1, "reel {reel_index} planned with zero cycles");
        Self {
            reel_index,
            final_symbol,
            total_cycles,
            cycles: 0,
            locked: false,
        }
    }

    pub fn reel_index(&self) -> usize {
        self.reel_index
    }

    pub fn total_cycles(&self) -> u32 {
        self.total_cycles
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn final_symbol(&self) -> &Symbol {
        &self.final_symbol
    }

    /// Advance one tick. Panics if called after the lock tick.
    pub fn tick<E: Entropy + ?Sized>(&mut self, catalog: &SymbolCatalog, entropy: &mut E) -> ReelTick {
        assert!(
            !self.locked,
            "reel {} ticked after locking",
            self.reel_index
        );

        self.cycles += 1;
        if self.cycles >= self.total_cycles {
            self.locked = true;
            ReelTick::Lock(self.final_symbol.clone())
        } else {
            ReelTick::Cycle(catalog.pick_random(entropy).clone())
        }
    }
}
