//! Spin session state machine
//!
//! `AwaitingOutcome → Animating → Resolved`, or `→ Aborted` from either of
//! the first two. The session owns the reels for the duration of a spin,
//! counts lock signals (never indexes on arrival order) and produces the
//! resolution exactly once.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::evaluator::evaluate;
use crate::outcome::Outcome;
use crate::reel::Reel;
use crate::symbols::{Symbol, SymbolCatalog};
use reel_stage::SpinVerdict;

/// Unique id of one spin request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spin-{:06}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    AwaitingOutcome,
    Animating,
    Resolved,
    Aborted,
}

impl SessionStatus {
    /// Resolved or Aborted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Aborted)
    }
}

/// Final result of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub request_id: RequestId,
    pub verdict: SpinVerdict,
    pub outcome: Outcome,
}

/// One spin from trigger to resolution
#[derive(Debug, Clone)]
pub struct SpinSession {
    request_id: RequestId,
    reels: Vec<Reel>,
    outcome: Option<Outcome>,
    status: SessionStatus,
    locked: usize,
}

impl SpinSession {
    /// Take ownership of the reels and start waiting for an outcome
    pub fn begin(request_id: RequestId, mut reels: Vec<Reel>) -> Self {
        assert!(!reels.is_empty(), "session {request_id} started without reels");
        for reel in &mut reels {
            reel.reset();
        }

        Self {
            request_id,
            reels,
            outcome: None,
            status: SessionStatus::AwaitingOutcome,
            locked: 0,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn reels(&self) -> &[Reel] {
        &self.reels
    }

    pub fn reel_count(&self) -> usize {
        self.reels.len()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn locked_count(&self) -> usize {
        self.locked
    }

    /// Fix the outcome and start every reel cycling.
    ///
    /// A malformed outcome leaves the session in `AwaitingOutcome` so the
    /// caller can abort it.
    pub fn accept_outcome(
        &mut self,
        outcome: Outcome,
        catalog: &SymbolCatalog,
    ) -> Result<(), FetchError> {
        assert_eq!(
            self.status,
            SessionStatus::AwaitingOutcome,
            "session {} received an outcome while {:?}",
            self.request_id,
            self.status
        );

        if outcome.len() != self.reels.len() {
            return Err(FetchError::WrongLength {
                expected: self.reels.len(),
                actual: outcome.len(),
            });
        }
        if let Some(unknown) = outcome.symbols().iter().find(|s| !catalog.contains(s)) {
            return Err(FetchError::UnknownSymbol(unknown.as_str().to_owned()));
        }

        self.outcome = Some(outcome);
        self.status = SessionStatus::Animating;
        for reel in &mut self.reels {
            reel.start_cycling();
        }
        Ok(())
    }

    /// Cosmetic tick on one reel
    pub fn show(&mut self, reel_index: usize, symbol: Symbol) {
        self.assert_animating("ticked");
        self.reel_mut(reel_index).show(symbol);
    }

    /// Lock one reel. Returns the resolution when this was the last reel.
    pub fn lock(&mut self, reel_index: usize, symbol: Symbol) -> Option<Resolution> {
        self.assert_animating("locked a reel");

        let expected = self.outcome.as_ref().and_then(|o| o.get(reel_index));
        assert_eq!(
            expected,
            Some(&symbol),
            "reel {reel_index} of {} locked on a symbol other than its outcome",
            self.request_id
        );

        self.reel_mut(reel_index).lock(symbol);
        self.locked += 1;

        if self.locked < self.reels.len() {
            return None;
        }

        self.status = SessionStatus::Resolved;
        let outcome = self.outcome.clone()?;
        Some(Resolution {
            request_id: self.request_id,
            verdict: evaluate(outcome.symbols()),
            outcome,
        })
    }

    /// Abort an unresolved session; reels go back to Idle.
    /// Returns false if the session had already ended.
    pub fn abort(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Aborted;
        for reel in &mut self.reels {
            reel.reset();
        }
        true
    }

    /// Hand the reels back for the next spin
    pub fn into_reels(self) -> Vec<Reel> {
        self.reels
    }

    fn assert_animating(&self, action: &str) {
        assert_eq!(
            self.status,
            SessionStatus::Animating,
            "session {} {action} while {:?}",
            self.request_id,
            self.status
        );
    }

    fn reel_mut(&mut self, reel_index: usize) -> &mut Reel {
        let request_id = self.request_id;
        self.reels
            .get_mut(reel_index)
            .unwrap_or_else(|| panic!("session {request_id} has no reel {reel_index}"))
    }
}
