//! StageEvent - A stage occurrence with timing and session metadata

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// A stage event as broadcast by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The stage
    pub stage: Stage,

    /// Milliseconds since the controller started
    pub timestamp_ms: f64,

    /// Spin request this event belongs to (None for stages outside a session)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl StageEvent {
    /// Create an event that does not belong to a session
    pub fn new(stage: Stage, timestamp_ms: f64) -> Self {
        Self {
            stage,
            timestamp_ms,
            request_id: None,
        }
    }

    /// Create an event for a spin request
    pub fn for_request(stage: Stage, timestamp_ms: f64, request_id: u64) -> Self {
        Self {
            stage,
            timestamp_ms,
            request_id: Some(request_id),
        }
    }

    /// Get stage type name
    pub fn type_name(&self) -> &'static str {
        self.stage.type_name()
    }
}
