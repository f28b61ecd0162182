//! Relay configuration with sane defaults, loaded once at startup.

use std::time::Duration;

use crate::error::ConfigError;

/// Generic events endpoint of the incident-management API.
pub const DEFAULT_API_URL: &str = "https://events.pagerduty.com/generic/2010-04-15/create_event.json";

/// Endpoints, secrets and retry policy shared by every trigger/resolve flow.
#[derive(Debug, Clone)]
pub struct Config {
  /// Alert endpoint (POST).
  pub api_url: String,
  /// Sent as `Authorization: Token token=<api_key>`.
  pub api_key: String,
  /// Sent in the payload as `service_key`.
  pub service_key: String,
  /// Static client identifier included in every payload.
  pub client: String,
  pub client_url: String,
  /// Incident description when the dispatch settings carry none.
  pub default_description: String,
  /// Prepended to the description on resolve.
  pub resolve_prefix: String,
  /// Per-attempt timeout.
  pub timeout: Duration,
  pub max_attempts: u32,
  /// First retry delay; doubles per attempt up to `max_backoff`.
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
  /// Document store base URL, or `memory` for the in-process index.
  pub index_url: String,
  pub index_name: String,
  /// Records expire `record_ttl` after they are written; expired records are
  /// purged from the document store at startup.
  pub record_ttl: Duration,
  /// Hold a per-key lock across each flow (process-local).
  pub serialize_per_key: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_url: DEFAULT_API_URL.to_string(),
      api_key: String::new(),
      service_key: String::new(),
      client: "IncidentRelay".to_string(),
      client_url: "http://localhost".to_string(),
      default_description: "Event created by incident relay.".to_string(),
      resolve_prefix: "Resolved: ".to_string(),
      timeout: Duration::from_secs(15),
      max_attempts: 3,
      initial_backoff: Duration::from_millis(500),
      max_backoff: Duration::from_secs(10),
      index_url: "http://127.0.0.1:9200".to_string(),
      index_name: "incident-relay".to_string(),
      record_ttl: Duration::from_secs(7 * 24 * 60 * 60),
      serialize_per_key: false,
    }
  }
}

impl Config {
  /// Load from `RELAY_*` environment variables.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|var| std::env::var(var).ok())
  }

  /// Load from an arbitrary variable source. Secrets are required; everything
  /// else falls back to `Config::default()`.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
    let defaults = Self::default();

    let api_key = get("RELAY_API_KEY").ok_or_else(|| ConfigError::missing("RELAY_API_KEY"))?;
    let service_key =
      get("RELAY_SERVICE_KEY").ok_or_else(|| ConfigError::missing("RELAY_SERVICE_KEY"))?;

    let max_attempts = match get("RELAY_MAX_ATTEMPTS") {
      Some(v) => {
        let n: u32 = v
          .parse()
          .map_err(|_| ConfigError::invalid("RELAY_MAX_ATTEMPTS", "expected a positive integer"))?;
        if n == 0 {
          return Err(ConfigError::invalid("RELAY_MAX_ATTEMPTS", "must be at least 1"));
        }
        n
      }
      None => defaults.max_attempts,
    };

    let serialize_per_key = match get("RELAY_SERIALIZE_PER_KEY") {
      Some(v) => match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => return Err(ConfigError::invalid("RELAY_SERIALIZE_PER_KEY", "expected true|false")),
      },
      None => defaults.serialize_per_key,
    };

    Ok(Self {
      api_url: get("RELAY_API_URL").unwrap_or(defaults.api_url),
      api_key,
      service_key,
      client: get("RELAY_CLIENT").unwrap_or(defaults.client),
      client_url: get("RELAY_CLIENT_URL").unwrap_or(defaults.client_url),
      default_description: get("RELAY_DEFAULT_DESCRIPTION").unwrap_or(defaults.default_description),
      resolve_prefix: lookup("RELAY_RESOLVE_PREFIX").unwrap_or(defaults.resolve_prefix),
      timeout: secs(&get, "RELAY_TIMEOUT_SECS")?.unwrap_or(defaults.timeout),
      max_attempts,
      initial_backoff: millis(&get, "RELAY_BACKOFF_MS")?.unwrap_or(defaults.initial_backoff),
      max_backoff: millis(&get, "RELAY_MAX_BACKOFF_MS")?.unwrap_or(defaults.max_backoff),
      index_url: get("RELAY_INDEX_URL").unwrap_or(defaults.index_url),
      index_name: get("RELAY_INDEX_NAME").unwrap_or(defaults.index_name),
      record_ttl: secs(&get, "RELAY_RECORD_TTL_SECS")?.unwrap_or(defaults.record_ttl),
      serialize_per_key,
    })
  }
}

fn secs<G>(get: &G, var: &str) -> Result<Option<Duration>, ConfigError>
where
  G: Fn(&str) -> Option<String>,
{
  parse_u64(get, var).map(|v| v.map(Duration::from_secs))
}

fn millis<G>(get: &G, var: &str) -> Result<Option<Duration>, ConfigError>
where
  G: Fn(&str) -> Option<String>,
{
  parse_u64(get, var).map(|v| v.map(Duration::from_millis))
}

fn parse_u64<G>(get: &G, var: &str) -> Result<Option<u64>, ConfigError>
where
  G: Fn(&str) -> Option<String>,
{
  match get(var) {
    Some(v) => v
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| ConfigError::invalid(var, format!("expected an integer, got {:?}", v))),
    None => Ok(None),
  }
}
