use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Closed set of categories a monitor can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    FileModified,
    UnauthorizedAccess,
    ProcessStart,
    NetworkConnection,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::FileModified => "FILE_MODIFIED",
            EventKind::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            EventKind::ProcessStart => "PROCESS_START",
            EventKind::NetworkConnection => "NETWORK_CONNECTION",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a source saw on one tick, before the producer stamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub kind: EventKind,
    pub payload: String,
}

impl Observation {
    pub fn new(kind: EventKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

/// A unit of work travelling from a producer to the sink.
///
/// Fields are private: an event cannot be altered once a producer has emitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    source_id: String,
    kind: EventKind,
    payload: String,
    timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(source_id: impl Into<String>, kind: EventKind, payload: impl Into<String>) -> Self {
        Self::at(source_id, kind, payload, Utc::now())
    }

    pub fn at(
        source_id: impl Into<String>,
        kind: EventKind,
        payload: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            kind,
            payload: payload.into(),
            timestamp,
        }
    }

    pub fn from_observation(source_id: &str, observation: Observation) -> Self {
        Self::new(source_id, observation.kind, observation.payload)
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Content digest, stable for a given event value.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.source_id.as_bytes());
        hasher.update(b";");
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(b";");
        hasher.update(self.payload.as_bytes());
        hasher.update(b";");
        hasher.update(self.timestamp.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());

        hex::encode(hasher.finalize())
    }
}

/// JSON body exchanged between the agent and the audit server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Alert {
    pub agent_id: String,
    pub event_type: EventKind,
    pub details: String,
    /// Unix seconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Alert {
    pub fn from_event(agent_id: &str, event: &Event) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            event_type: event.kind(),
            details: event.payload().to_string(),
            timestamp: event.timestamp().timestamp(),
            source: Some(event.source_id().to_string()),
        }
    }
}
