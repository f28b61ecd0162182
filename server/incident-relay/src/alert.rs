//! Outbound alert calls: POST with per-attempt timeout, bounded attempts and backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::config::Config;
use crate::error::AlertError;
use crate::types::AlertPayload;

/// Capability to deliver one alert payload. `Ok` means the remote service
/// accepted it and carries the response body.
#[async_trait]
pub trait AlertSender: Send + Sync {
  async fn send(&self, payload: &AlertPayload) -> Result<String, AlertError>;
}

/// Retry policy for [`HttpAlertSender`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  pub timeout: Duration,
  pub max_attempts: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
}

impl RetryPolicy {
  pub fn from_config(config: &Config) -> Self {
    Self {
      timeout: config.timeout,
      max_attempts: config.max_attempts.max(1),
      initial_backoff: config.initial_backoff,
      max_backoff: config.max_backoff,
    }
  }
}

/// reqwest-backed sender for the generic events API.
#[derive(Debug, Clone)]
pub struct HttpAlertSender {
  client: reqwest::Client,
  url: String,
  policy: RetryPolicy,
}

impl HttpAlertSender {
  pub fn new(config: &Config) -> Result<Self, AlertError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut auth = HeaderValue::from_str(&format!("Token token={}", config.api_key))
      .map_err(|e| AlertError::Client(format!("api key is not a valid header value: {}", e)))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    let policy = RetryPolicy::from_config(config);
    let client = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(policy.timeout)
      .build()
      .map_err(|e| AlertError::Client(e.to_string()))?;

    Ok(Self {
      client,
      url: config.api_url.clone(),
      policy,
    })
  }
}

/// 5xx and 429 are worth another attempt; other rejections are final.
fn is_retryable(status: StatusCode) -> bool {
  status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl AlertSender for HttpAlertSender {
  async fn send(&self, payload: &AlertPayload) -> Result<String, AlertError> {
    let mut backoff = self.policy.initial_backoff;
    let mut last_err = String::new();

    for attempt in 1..=self.policy.max_attempts {
      if attempt > 1 {
        tracing::debug!(
          incident_key = %payload.incident_key,
          attempt,
          max_attempts = self.policy.max_attempts,
          ?backoff,
          "alert: retrying"
        );
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(self.policy.max_backoff);
      }

      match self.client.post(&self.url).json(payload).send().await {
        Ok(resp) => {
          let status = resp.status();
          let body = resp.text().await.unwrap_or_default();
          if status.is_success() {
            return Ok(body);
          }
          if !is_retryable(status) {
            return Err(AlertError::Rejected {
              status: status.as_u16(),
              body,
            });
          }
          last_err = format!("HTTP {}: {}", status, body);
        }
        Err(e) => {
          last_err = e.to_string();
        }
      }
    }

    Err(AlertError::Exhausted {
      attempts: self.policy.max_attempts,
      last: last_err,
    })
  }
}
