//! # reel-engine - Outcome-and-timing engine for a slot mini-game
//!
//! Decides the final symbols of a spin under a weighted random policy,
//! staggers each reel's stop so the deceleration reads left to right, and
//! resolves the spin into WIN or LOSE exactly once, after every reel has
//! locked.
//!
//! ## Architecture
//!
//! ```text
//! SpinHandle ──trigger/cancel──▶ SpinController (one task, one session at a time)
//!     ▲                              │
//!     │ StageEvent broadcast         ├── OutcomeSource (mock server, 500–1200 ms)
//!     │ spin-in-progress watch       │      └── OutcomeGenerator ── SymbolCatalog
//!     │ MachineView snapshot         ├── ReelTimeline × N (spawned interval tasks)
//!     │                              └── SpinSession (AwaitingOutcome → Animating → Resolved)
//!     │                                     └── evaluate()
//! presentation layer
//! ```
//!
//! Everything except [`controller`] and [`server`] is synchronous and free
//! of clocks; the controller is the only place that touches tokio time.

pub mod config;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod outcome;
pub mod reel;
pub mod server;
pub mod session;
pub mod symbols;
pub mod timing;

#[cfg(test)]
pub(crate) mod testing;

pub use config::*;
pub use controller::*;
pub use error::*;
pub use evaluator::*;
pub use outcome::*;
pub use reel::*;
pub use server::*;
pub use session::*;
pub use symbols::*;
pub use timing::*;

pub use reel_stage::{AbortReason, SpinVerdict, Stage, StageEvent};
