//! Incident lifecycle: open the remote incident on trigger, close it on resolve,
//! and keep the correlation index in step with what the remote side accepted.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::alert::AlertSender;
use crate::config::Config;
use crate::index::CorrelationIndex;
use crate::key;
use crate::keylock::{KeyGuard, KeyLocks};
use crate::types::*;

/// Stateless apart from the injected index. Cheap to clone; clones share the
/// sender, the index and the key locks.
#[derive(Clone)]
pub struct IncidentController {
  inner: Arc<Inner>,
}

struct Inner {
  config: Arc<Config>,
  sender: Arc<dyn AlertSender>,
  index: Arc<dyn CorrelationIndex>,
  locks: Option<KeyLocks>,
}

impl IncidentController {
  pub fn new(
    config: Arc<Config>,
    sender: Arc<dyn AlertSender>,
    index: Arc<dyn CorrelationIndex>,
  ) -> Self {
    let locks = config.serialize_per_key.then(KeyLocks::new);
    Self {
      inner: Arc::new(Inner {
        config,
        sender,
        index,
        locks,
      }),
    }
  }

  /// Open (or refresh) the incident for this episode.
  ///
  /// Returns immediately; the call and the record write run on a spawned task.
  /// Dropping the handle does not cancel the flow. Must be called from within
  /// a Tokio runtime.
  pub fn trigger(&self, event: &Event, monitor: &Monitor, settings: &Settings) -> JoinHandle<Outcome> {
    let key = key::derive(&monitor.id, &event.resource.id);
    let description = self.inner.description(settings);
    let payload = self.inner.payload(
      EventType::Trigger,
      key.clone(),
      description.clone(),
      event.details.clone(),
    );
    let opened = Opened {
      monitor_id: monitor.id.clone(),
      resource_id: event.resource.id.clone(),
      key,
      description,
    };

    let inner = self.inner.clone();
    tokio::spawn(async move { inner.run_trigger(payload, opened).await })
  }

  /// Close the incident for this episode, if the index knows of one.
  ///
  /// Same execution model as [`IncidentController::trigger`].
  pub fn resolve(&self, event: &Event, monitor: &Monitor, settings: &Settings) -> JoinHandle<Outcome> {
    let key = key::derive(&monitor.id, &event.resource.id);
    let description = format!(
      "{}{}",
      self.inner.config.resolve_prefix,
      self.inner.description(settings)
    );
    let payload = self.inner.payload(EventType::Resolve, key, description, event.details.clone());

    let inner = self.inner.clone();
    tokio::spawn(async move { inner.run_resolve(payload).await })
  }

  /// Route a parsed dispatch line to the matching entry point.
  pub fn dispatch(&self, dispatch: &Dispatch) -> JoinHandle<Outcome> {
    match dispatch.action {
      Action::Trigger => self.trigger(&dispatch.event, &dispatch.monitor, &dispatch.settings),
      Action::Resolve => self.resolve(&dispatch.event, &dispatch.monitor, &dispatch.settings),
    }
  }
}

/// Record fields known before the call; `opened_at` and `expires_at` are
/// stamped on acceptance.
struct Opened {
  monitor_id: String,
  resource_id: String,
  key: CorrelationKey,
  description: String,
}

impl Inner {
  fn description(&self, settings: &Settings) -> String {
    settings
      .description
      .as_deref()
      .filter(|d| !d.is_empty())
      .unwrap_or(&self.config.default_description)
      .to_string()
  }

  fn payload(
    &self,
    event_type: EventType,
    incident_key: CorrelationKey,
    description: String,
    details: Map<String, Value>,
  ) -> AlertPayload {
    AlertPayload {
      service_key: self.config.service_key.clone(),
      event_type,
      incident_key,
      description,
      details,
      client: self.config.client.clone(),
      client_url: self.config.client_url.clone(),
    }
  }

  async fn lock(&self, key: &CorrelationKey) -> Option<KeyGuard<'_>> {
    match &self.locks {
      Some(locks) => Some(locks.acquire(key).await),
      None => None,
    }
  }

  async fn run_trigger(&self, payload: AlertPayload, opened: Opened) -> Outcome {
    let key = &opened.key;
    let _guard = self.lock(key).await;

    if let Err(e) = self.sender.send(&payload).await {
      tracing::error!(incident_key = %key, error = %e, body = e.body(), "trigger call failed");
      return Outcome::TriggerFailed;
    }

    let opened_at = Utc::now();
    let expires_at = chrono::Duration::from_std(self.config.record_ttl)
      .ok()
      .and_then(|ttl| opened_at.checked_add_signed(ttl));
    let record = IncidentRecord {
      monitor_id: opened.monitor_id,
      resource_id: opened.resource_id,
      incident_key: key.clone(),
      description: opened.description,
      opened_at,
      expires_at,
    };
    match self.index.put(key, &record).await {
      Ok(()) => {
        tracing::info!(incident_key = %key, "incident triggered");
        Outcome::Triggered
      }
      Err(e) => {
        tracing::error!(
          incident_key = %key,
          error = %e,
          "incident triggered remotely but the correlation record was not written"
        );
        Outcome::RecordWriteFailed
      }
    }
  }

  async fn run_resolve(&self, payload: AlertPayload) -> Outcome {
    let key = &payload.incident_key;
    let _guard = self.lock(key).await;

    match self.index.exists(key).await {
      Ok(()) => {}
      Err(e) if e.is_not_found() => {
        tracing::debug!(incident_key = %key, "no open incident; nothing to resolve");
        return Outcome::NothingToResolve;
      }
      Err(e) => {
        tracing::error!(incident_key = %key, error = %e, "correlation lookup failed; resolve skipped");
        return Outcome::LookupFailed;
      }
    }

    if let Err(e) = self.sender.send(&payload).await {
      tracing::error!(incident_key = %key, error = %e, body = e.body(), "resolve call failed");
      return Outcome::ResolveFailed;
    }

    match self.index.delete(key).await {
      Ok(()) => {
        tracing::info!(incident_key = %key, "incident resolved");
        Outcome::Resolved
      }
      Err(e) => {
        tracing::error!(
          incident_key = %key,
          error = %e,
          "incident resolved remotely but the correlation record was not deleted"
        );
        Outcome::RecordDeleteFailed
      }
    }
  }
}
