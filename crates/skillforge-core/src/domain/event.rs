//! Activity-stream events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Well-known stage names.
pub mod stage {
    pub const PLAN: &str = "plan";
    pub const ACTION: &str = "action";
    pub const OBSERVATION: &str = "observation";
    pub const ERROR: &str = "error";
    pub const DONE: &str = "done";
}

/// Identifier assigned once per run and carried by every event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TraceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Coarse classification derived from the stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Thought,
    Action,
    Observation,
}

impl EventKind {
    /// `plan|thought` are thoughts, `action|search|extract` are actions,
    /// everything else is an observation.
    pub fn for_stage(stage: &str) -> Self {
        match stage {
            "plan" | "thought" => EventKind::Thought,
            "action" | "search" | "extract" => EventKind::Action,
            _ => EventKind::Observation,
        }
    }
}

/// An event as produced by a stage, before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub trace_id: TraceId,
    pub agent: String,
    pub stage: String,
    pub message: String,
    pub payload: Map<String, Value>,
}

impl RawEvent {
    /// Object payloads are kept as-is, `null` becomes empty, and any other
    /// value is wrapped under `value`.
    pub fn payload_from(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        }
    }
}

/// An enriched stream event. Emission order is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the run's stream, starting at 0.
    pub seq: u64,
    pub trace_id: TraceId,
    pub agent: String,
    pub stage: String,
    pub message: String,
    pub payload: Map<String, Value>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<bool>,
}

impl Event {
    pub fn from_raw(raw: RawEvent, seq: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            seq,
            trace_id: raw.trace_id,
            agent: raw.agent,
            stage: raw.stage,
            message: raw.message,
            payload: raw.payload,
            timestamp,
            kind: None,
            terminal: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal == Some(true)
    }
}
