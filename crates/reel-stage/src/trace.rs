//! SpinTrace - The complete sequence of stage events for one spin
//!
//! Traces are recorded by the presentation side (or tests) from the event
//! broadcast and validated against the session contract: one terminal
//! stage, every reel locked exactly once, resolution strictly after the
//! last lock.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::StageEvent;
use crate::stage::Stage;
use crate::taxonomy::{AbortReason, SpinVerdict};

/// A complete trace of stage events for one spin request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinTrace {
    /// Unique identifier for this trace
    pub trace_id: String,

    /// Spin request the events belong to
    pub request_id: u64,

    /// All events in arrival order
    pub events: Vec<StageEvent>,

    /// When this trace was recorded
    pub recorded_at: DateTime<Utc>,

    /// Custom metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SpinTrace {
    /// Create a new empty trace
    pub fn new(request_id: u64) -> Self {
        Self {
            trace_id: format!("spin-{request_id:06}"),
            request_id,
            events: Vec::new(),
            recorded_at: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Add an event to the trace
    pub fn push(&mut self, event: StageEvent) {
        self.events.push(event);
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get total duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0.0,
        }
    }

    /// Get events by stage type name
    pub fn events_by_type(&self, type_name: &str) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.type_name() == type_name)
            .collect()
    }

    /// Get all reel lock events
    pub fn reel_locks(&self) -> Vec<&StageEvent> {
        self.events_by_type("reel_locked")
    }

    /// Verdict of the spin, if it resolved
    pub fn verdict(&self) -> Option<SpinVerdict> {
        self.events.iter().find_map(|e| match &e.stage {
            Stage::Resolved { verdict, .. } => Some(*verdict),
            _ => None,
        })
    }

    /// Authoritative outcome, as announced when it arrived
    pub fn outcome(&self) -> Option<&[String]> {
        self.events.iter().find_map(|e| match &e.stage {
            Stage::OutcomeReceived { symbols } => Some(symbols.as_slice()),
            _ => None,
        })
    }

    /// Abort reason, if the session was aborted
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        self.events.iter().find_map(|e| match &e.stage {
            Stage::Aborted { reason } => Some(reason),
            _ => None,
        })
    }

    /// Validate the trace against the session contract
    pub fn validate(&self) -> TraceValidation {
        let mut validation = TraceValidation::default();
        let mut locked: BTreeMap<u8, usize> = BTreeMap::new();
        let outcome = self.outcome();

        for event in &self.events {
            match &event.stage {
                Stage::SpinRequested { reel_count } => validation.reel_count = Some(*reel_count),
                Stage::ReelTick { reel_index, .. } => {
                    if locked.contains_key(reel_index) {
                        validation.ticks_after_lock += 1;
                    }
                }
                Stage::ReelLocked { reel_index, symbol } => {
                    *locked.entry(*reel_index).or_default() += 1;
                    let expected = outcome.and_then(|o| o.get(*reel_index as usize));
                    if expected != Some(symbol) {
                        validation.lock_mismatches += 1;
                    }
                    if validation.resolution_count > 0 {
                        validation.locks_after_resolution += 1;
                    }
                }
                Stage::Resolved { .. } => {
                    validation.resolution_count += 1;
                    let expected_reels = validation.reel_count.unwrap_or(0) as usize;
                    validation.resolved_after_all_locks = expected_reels > 0
                        && locked.len() == expected_reels
                        && locked.values().all(|&count| count == 1);
                }
                Stage::Aborted { .. } => validation.abort_count += 1,
                _ => {}
            }
        }

        validation.locks_per_reel = locked;
        validation
    }

    /// Get summary of trace
    pub fn summary(&self) -> TraceSummary {
        TraceSummary {
            trace_id: self.trace_id.clone(),
            request_id: self.request_id,
            event_count: self.events.len(),
            duration_ms: self.duration_ms(),
            verdict: self.verdict(),
            aborted: self.abort_reason().is_some(),
        }
    }
}

/// Validation result for a trace
#[derive(Debug, Clone, Default)]
pub struct TraceValidation {
    pub reel_count: Option<u8>,
    pub locks_per_reel: BTreeMap<u8, usize>,
    pub resolution_count: usize,
    pub abort_count: usize,
    pub resolved_after_all_locks: bool,
    pub ticks_after_lock: usize,
    pub locks_after_resolution: usize,
    pub lock_mismatches: usize,
}

impl TraceValidation {
    /// Check if the trace honours the session contract
    pub fn is_valid(&self) -> bool {
        self.warnings().is_empty()
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();

        if self.reel_count.is_none() {
            warnings.push("Missing SPIN_REQUESTED event");
        }
        match (self.resolution_count, self.abort_count) {
            (1, 0) => {
                if !self.resolved_after_all_locks {
                    warnings.push("Resolved before every reel locked exactly once");
                }
            }
            (0, 1) => {}
            (0, 0) => warnings.push("Missing terminal event"),
            (r, _) if r > 1 => warnings.push("Resolution fired more than once"),
            _ => warnings.push("Both resolved and aborted"),
        }
        if self.lock_mismatches > 0 {
            warnings.push("A reel locked on a symbol other than its outcome");
        }
        if self.ticks_after_lock > 0 {
            warnings.push("Cosmetic tick after reel lock");
        }
        if self.locks_after_resolution > 0 {
            warnings.push("Reel locked after resolution");
        }

        warnings
    }
}

/// Summary of a trace for quick overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSummary {
    pub trace_id: String,
    pub request_id: u64,
    pub event_count: usize,
    pub duration_ms: f64,
    pub verdict: Option<SpinVerdict>,
    pub aborted: bool,
}

/// Collection of traces (e.g., one play session)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceCollection {
    pub traces: Vec<SpinTrace>,
}

impl TraceCollection {
    /// Group a flat event stream into per-request traces.
    /// Events without a request id are dropped.
    pub fn from_events(events: impl IntoIterator<Item = StageEvent>) -> Self {
        let mut grouped: BTreeMap<u64, SpinTrace> = BTreeMap::new();
        for event in events {
            if let Some(request_id) = event.request_id {
                grouped
                    .entry(request_id)
                    .or_insert_with(|| SpinTrace::new(request_id))
                    .push(event);
            }
        }
        Self {
            traces: grouped.into_values().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Attach the same metadata entry to every trace
    pub fn with_metadata(self, key: &str, value: serde_json::Value) -> Self {
        Self {
            traces: self
                .traces
                .into_iter()
                .map(|trace| trace.with_metadata(key, value.clone()))
                .collect(),
        }
    }

    /// Get summary stats
    pub fn stats(&self) -> CollectionStats {
        let wins = self
            .traces
            .iter()
            .filter(|t| t.verdict() == Some(SpinVerdict::Win))
            .count();
        let losses = self
            .traces
            .iter()
            .filter(|t| t.verdict() == Some(SpinVerdict::Lose))
            .count();
        let aborted = self
            .traces
            .iter()
            .filter(|t| t.abort_reason().is_some())
            .count();
        let resolved = wins + losses;

        CollectionStats {
            trace_count: self.traces.len(),
            wins,
            losses,
            aborted,
            win_rate: if resolved == 0 {
                0.0
            } else {
                wins as f64 / resolved as f64
            },
        }
    }
}

/// Stats for a trace collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub trace_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub aborted: usize,
    pub win_rate: f64,
}
