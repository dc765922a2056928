//! # reel-stage - Spin signal vocabulary
//!
//! Every moment of a spin that the presentation layer can react to is a
//! [`Stage`]. The engine emits stages wrapped in a [`StageEvent`]; the
//! presentation layer renders symbols, plays cues and toggles the trigger
//! control in response. Nothing here knows how a spin is computed.
//!
//! ## Flow
//!
//! ```text
//! SpinRequested → OutcomeReceived → ReelSpinning × N
//!     → (ReelTick* → ReelLocked) × N → Resolved → SpinAvailable
//!
//! any point before Resolved → Aborted → SpinAvailable
//! ```

pub mod event;
pub mod stage;
pub mod taxonomy;
pub mod trace;

pub use event::*;
pub use stage::*;
pub use taxonomy::*;
pub use trace::*;
