//! Structured error types for the relay.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config: {var} must be set")]
  Missing { var: String },

  #[error("config: {var}: {reason}")]
  Invalid { var: String, reason: String },
}

impl ConfigError {
  pub fn missing(var: &str) -> Self {
    Self::Missing { var: var.to_string() }
  }

  pub fn invalid(var: &str, reason: impl Into<String>) -> Self {
    Self::Invalid {
      var: var.to_string(),
      reason: reason.into(),
    }
  }
}

/// Failure of an outbound alert call, after the sender's own retries.
#[derive(Debug, Error)]
pub enum AlertError {
  #[error("alert rejected: HTTP {status}: {body}")]
  Rejected { status: u16, body: String },

  #[error("alert failed after {attempts} attempts: {last}")]
  Exhausted { attempts: u32, last: String },

  #[error("alert client: {0}")]
  Client(String),
}

impl AlertError {
  /// Response body (or transport error text) for logging.
  pub fn body(&self) -> &str {
    match self {
      Self::Rejected { body, .. } => body,
      Self::Exhausted { last, .. } => last,
      Self::Client(msg) => msg,
    }
  }
}

#[derive(Debug, Error)]
pub enum IndexError {
  #[error("index: no record at {key}")]
  NotFound { key: String },

  #[error("index unavailable: {0}")]
  Unavailable(String),

  #[error("index rejected: HTTP {status}: {body}")]
  Rejected { status: u16, body: String },

  #[error("index json: {0}")]
  Json(#[from] serde_json::Error),
}

impl IndexError {
  pub fn not_found(key: &str) -> Self {
    Self::NotFound { key: key.to_string() }
  }

  pub fn unavailable(msg: impl Into<String>) -> Self {
    Self::Unavailable(msg.into())
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}
