//! Outcome source - the "server" collaborator
//!
//! The engine only needs "given a reel count, eventually return that many
//! symbols". [`MockServer`] answers locally after a simulated round-trip; a
//! real network client implements [`OutcomeSource`] the same way.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::outcome::{Outcome, OutcomeGenerator};
use crate::symbols::Entropy;

/// Supplies the authoritative outcome of a spin
pub trait OutcomeSource: Send + Sync + 'static {
    fn request_outcome(
        &self,
        reel_count: usize,
    ) -> impl Future<Output = Result<Outcome, FetchError>> + Send;
}

/// Simulated round-trip latency, uniform in `[min_ms, max_ms]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    /// Longest round-trip a config may ask for (one hour)
    pub const MAX_MS: u64 = 3_600_000;

    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// No delay at all
    pub fn instant() -> Self {
        Self::new(0, 0)
    }

    /// `min <= max <= MAX_MS`
    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms && self.max_ms <= Self::MAX_MS
    }

    /// Draw a delay. Bounds past `MAX_MS` are clamped.
    pub fn sample<E: Entropy + ?Sized>(&self, entropy: &mut E) -> Duration {
        let max_ms = self.max_ms.min(Self::MAX_MS);
        let min_ms = self.min_ms.min(max_ms);
        let span = (max_ms - min_ms) as usize;
        let offset = if span == 0 { 0 } else { entropy.index(span + 1) as u64 };
        Duration::from_millis(min_ms + offset)
    }
}

impl Default for LatencyRange {
    fn default() -> Self {
        Self::new(500, 1200)
    }
}

/// Local stand-in for the game server
pub struct MockServer<E = ChaCha8Rng> {
    generator: OutcomeGenerator,
    latency: LatencyRange,
    entropy: Mutex<E>,
}

impl MockServer<ChaCha8Rng> {
    /// Server seeded from the OS
    pub fn new(generator: OutcomeGenerator, latency: LatencyRange) -> Self {
        Self::with_entropy(generator, latency, ChaCha8Rng::from_os_rng())
    }

    /// Reproducible server
    pub fn seeded(generator: OutcomeGenerator, latency: LatencyRange, seed: u64) -> Self {
        Self::with_entropy(generator, latency, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<E: Entropy> MockServer<E> {
    pub fn with_entropy(generator: OutcomeGenerator, latency: LatencyRange, entropy: E) -> Self {
        Self {
            generator,
            latency,
            entropy: Mutex::new(entropy),
        }
    }

    pub fn generator(&self) -> &OutcomeGenerator {
        &self.generator
    }

    pub fn latency(&self) -> LatencyRange {
        self.latency
    }
}

impl<E: Entropy + Send + 'static> OutcomeSource for MockServer<E> {
    async fn request_outcome(&self, reel_count: usize) -> Result<Outcome, FetchError> {
        let delay = self.latency.sample(&mut *self.entropy.lock());
        log::debug!("[MockServer] answering {reel_count}-reel request in {delay:?}");
        tokio::time::sleep(delay).await;

        let outcome = self
            .generator
            .generate(reel_count, &mut *self.entropy.lock())
            .map_err(|e| FetchError::Rejected(e.to_string()))?;
        Ok(outcome)
    }
}
