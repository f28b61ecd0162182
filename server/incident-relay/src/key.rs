//! Stable correlation keys identifying one (monitor, resource) episode.

use crate::types::CorrelationKey;

/// Fixed namespace tag leading every key.
pub const NAMESPACE: &str = "ns";

/// Separator between key components. Identifiers containing it can collide.
pub const SEPARATOR: char = ';';

/// Derive the correlation key for a monitor/resource pair.
///
/// Both the trigger and the resolve path must go through this function; the
/// key is the only thing linking the two, remotely (`incident_key`) and in the
/// correlation index.
pub fn derive(monitor_id: &str, resource_id: &str) -> CorrelationKey {
  let mut key = String::with_capacity(NAMESPACE.len() + monitor_id.len() + resource_id.len() + 2);
  key.push_str(NAMESPACE);
  key.push(SEPARATOR);
  key.push_str(monitor_id);
  key.push(SEPARATOR);
  key.push_str(resource_id);
  CorrelationKey(key)
}
