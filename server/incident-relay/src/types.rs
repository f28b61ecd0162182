//! Core types for the relay (dispatch contract, index records, wire payloads).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// Correlation key
// ---------------------------------------------------------------------------

/// Deterministic episode identifier; see [`crate::key::derive`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(pub String);

impl CorrelationKey {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CorrelationKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ---------------------------------------------------------------------------
// Dispatch inputs (JSON contract — what the dispatcher sends)
// ---------------------------------------------------------------------------

/// The monitoring rule that owns the episode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Monitor {
  pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Resource {
  pub id: String,
}

/// One policy-violation (or resolution) event for a resource.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Event {
  pub resource: Resource,
  /// Structured details, forwarded as a JSON object. A non-object value
  /// fails to parse.
  #[serde(default)]
  pub details: Map<String, Value>,
}

impl Event {
  pub fn new(resource_id: impl Into<String>) -> Self {
    Self {
      resource: Resource { id: resource_id.into() },
      details: Map::new(),
    }
  }

  /// Objects are taken as-is; any other value is wrapped as `{"value": ...}`.
  pub fn with_details(mut self, details: Value) -> Self {
    self.details = match details {
      Value::Object(map) => map,
      other => {
        let mut map = Map::new();
        map.insert("value".to_string(), other);
        map
      }
    };
    self
  }
}

/// Per-action settings. Unknown options are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
  /// Incident description. Absent or empty means the configured default text.
  #[serde(default)]
  pub description: Option<String>,
}

impl Settings {
  pub fn with_description(description: impl Into<String>) -> Self {
    Self {
      description: Some(description.into()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
  Trigger,
  Resolve,
}

/// One stdin line for the relay binary.
#[derive(Debug, Clone, Deserialize)]
pub struct Dispatch {
  pub action: Action,
  pub monitor: Monitor,
  pub event: Event,
  #[serde(default)]
  pub settings: Settings,
}

// ---------------------------------------------------------------------------
// Correlation index record
// ---------------------------------------------------------------------------

/// Marks "an incident is currently open for this episode".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
  pub monitor_id: String,
  pub resource_id: String,
  pub incident_key: CorrelationKey,
  pub description: String,
  pub opened_at: DateTime<Utc>,
  /// `opened_at + record_ttl`; past it, `DocumentStoreIndex::purge_expired`
  /// removes the record. `None` when the ttl does not fit a timestamp.
  #[serde(default)]
  pub expires_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Outbound payload (JSON contract — what the alerting API receives)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
  Trigger,
  Resolve,
}

/// Built fresh per call and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
  pub service_key: String,
  pub event_type: EventType,
  pub incident_key: CorrelationKey,
  pub description: String,
  pub details: Map<String, Value>,
  pub client: String,
  pub client_url: String,
}

// ---------------------------------------------------------------------------
// Flow outcomes
// ---------------------------------------------------------------------------

/// How one trigger or resolve flow ended. Diagnostic only; every non-success
/// variant has already been logged when it is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  /// Remote incident opened and recorded.
  Triggered,
  /// Remote call failed; index untouched.
  TriggerFailed,
  /// Remote incident opened but the record write failed.
  RecordWriteFailed,
  /// Remote incident closed and record removed.
  Resolved,
  /// No record for the key; no call issued.
  NothingToResolve,
  /// Index lookup failed for a reason other than "not found"; no call issued.
  LookupFailed,
  /// Remote call failed; record kept for a later retry.
  ResolveFailed,
  /// Remote incident closed but the record delete failed.
  RecordDeleteFailed,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// One stdout line per completed flow.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeOutput {
  pub incident_key: CorrelationKey,
  pub action: Action,
  pub outcome: Outcome,
}

/// Structured error output for invalid input lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
    }
  }
}
