//! Outcome evaluation

use reel_stage::SpinVerdict;

use crate::symbols::Symbol;

/// WIN iff every symbol equals the first one.
///
/// A single reel always wins; an empty slice never does.
pub fn evaluate(outcome: &[Symbol]) -> SpinVerdict {
    match outcome.split_first() {
        Some((first, rest)) if rest.iter().all(|s| s == first) => SpinVerdict::Win,
        _ => SpinVerdict::Lose,
    }
}
