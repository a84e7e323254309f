//! Event payloads (spec §4.F table).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    WakeWordDetected { word: String },
    SpeechStarted,
    SpeechEnded { utterance_len_bytes: usize },
    TranscriptReady {
        user_id: String,
        model_id: String,
        text: String,
        confidence: f32,
        language: String,
        latency_ms: u64,
    },
    StateChanged { old: String, new: String },
    PipelineSwitched { from: String, to: String, reason: String },
    ResponseReady {
        user_id: String,
        model_id: String,
        text: String,
        detected_emotion: Option<String>,
    },
    MotionTrigger { group: String, name: String, priority: u8 },
    Error { kind: String, message: String },
}

/// Every event carries a timestamp (spec §4.F: "each carrying a timestamp").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl BusEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }
}
