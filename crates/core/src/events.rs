use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured Event Envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: String,
    /// Sandbox the event belongs to (container name or private directory)
    pub sandbox: Option<String>,
    /// Component that produced the event
    pub actor: String,
    /// Timestamp of the event
    pub timestamp: DateTime<Utc>,
    /// Event type category
    pub event_type: EventType,
    /// Event severity level
    pub severity: EventSeverity,
    /// Structured payload (event-specific data)
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    pub fn new(event_type: EventType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sandbox: None,
            actor: "system".to_string(),
            timestamp: Utc::now(),
            event_type,
            severity: EventSeverity::Info,
            payload,
        }
    }

    pub fn with_sandbox(mut self, sandbox: &str) -> Self {
        self.sandbox = Some(sandbox.to_string());
        self
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Backend provisioned and ready
    SandboxCreated,
    /// Command finished (successfully or not)
    CommandExecuted,
    /// Command exceeded its timeout
    CommandTimedOut,
    /// Filesystem read operation
    FsRead,
    /// Filesystem write operation
    FsWrite,
    /// Backend torn down
    SandboxDestroyed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// Helper structs for common payloads

#[derive(Serialize, Deserialize)]
pub struct CommandPayload {
    pub command: String,
    pub exit_code: Option<i64>,
    pub duration_ms: u64,
}

#[derive(Serialize, Deserialize)]
pub struct FsPayload {
    pub path: String,
    pub operation: String, // "read", "write", "copy_from", "copy_to"
    pub size_bytes: Option<u64>,
}

#[derive(Serialize, Deserialize)]
pub struct LifecyclePayload {
    pub backend: String,
    pub errors: Vec<String>,
}

/// Trait for emitting structured events.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Emit an event.
    async fn emit(&self, event: EventEnvelope);
}

/// Keeps every emitted event in memory.
#[derive(Default)]
pub struct RecordingEventEmitter {
    events: std::sync::Mutex<Vec<EventEnvelope>>,
}

impl RecordingEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, event_type: &EventType) -> usize {
        self.events()
            .iter()
            .filter(|e| &e.event_type == event_type)
            .count()
    }
}

#[async_trait]
impl EventEmitter for RecordingEventEmitter {
    async fn emit(&self, event: EventEnvelope) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
