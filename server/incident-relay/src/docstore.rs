//! Document-store correlation index over an Elasticsearch-style REST API.
//!
//! Records live at `/{index}/_doc/{key}`. A 404 on lookup means the record is
//! absent, whether or not the index itself exists yet.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Response, StatusCode};
use serde_json::json;

use crate::error::IndexError;
use crate::index::CorrelationIndex;
use crate::types::{CorrelationKey, IncidentRecord};

#[derive(Debug, Clone)]
pub struct DocumentStoreIndex {
  client: reqwest::Client,
  base_url: String,
  index_name: String,
}

impl DocumentStoreIndex {
  pub fn new(base_url: &str, index_name: &str, timeout: Duration) -> Result<Self, IndexError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| IndexError::unavailable(e.to_string()))?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      index_name: index_name.to_string(),
    })
  }

  pub fn index_name(&self) -> &str {
    &self.index_name
  }

  fn doc_url(&self, key: &CorrelationKey) -> String {
    format!(
      "{}/{}/_doc/{}",
      self.base_url,
      self.index_name,
      utf8_percent_encode(key.as_str(), NON_ALPHANUMERIC)
    )
  }

  /// Install the index template (field mappings, ttl noted in `_meta`). Run once
  /// at startup; overwriting an existing template is harmless.
  pub async fn require_template(&self, ttl: Duration) -> Result<(), IndexError> {
    let url = format!("{}/_index_template/{}-template", self.base_url, self.index_name);
    let keyword = json!({ "type": "keyword" });
    let body = json!({
      "index_patterns": [format!("{}*", self.index_name)],
      "priority": 0,
      "template": {
        "mappings": {
          "properties": {
            "monitor_id": keyword,
            "resource_id": keyword,
            "incident_key": keyword,
            "description": keyword,
            "opened_at": { "type": "date" },
            "expires_at": { "type": "date" }
          }
        }
      },
      "_meta": { "record_ttl_secs": ttl.as_secs() }
    });

    let resp = self.client.put(url).json(&body).send().await.map_err(transport)?;
    expect_success(resp).await
  }

  /// Delete every record whose `expires_at` is before `now`; returns how many
  /// went. A missing index has nothing to purge.
  pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, IndexError> {
    let url = format!("{}/{}/_delete_by_query", self.base_url, self.index_name);
    let body = json!({
      "query": { "range": { "expires_at": { "lt": now.to_rfc3339() } } }
    });

    let resp = self.client.post(url).json(&body).send().await.map_err(transport)?;
    match resp.status() {
      StatusCode::NOT_FOUND => Ok(0),
      s if s.is_success() => {
        let text = resp.text().await.map_err(transport)?;
        let reply: serde_json::Value = serde_json::from_str(&text)?;
        Ok(reply["deleted"].as_u64().unwrap_or(0))
      }
      _ => Err(failure(resp).await),
    }
  }
}

fn transport(e: reqwest::Error) -> IndexError {
  IndexError::unavailable(e.to_string())
}

async fn failure(resp: Response) -> IndexError {
  let status = resp.status();
  let body = resp.text().await.unwrap_or_default();
  if status.is_server_error() {
    IndexError::unavailable(format!("HTTP {}: {}", status, body))
  } else {
    IndexError::Rejected {
      status: status.as_u16(),
      body,
    }
  }
}

async fn expect_success(resp: Response) -> Result<(), IndexError> {
  if resp.status().is_success() {
    Ok(())
  } else {
    Err(failure(resp).await)
  }
}

#[async_trait]
impl CorrelationIndex for DocumentStoreIndex {
  async fn put(&self, key: &CorrelationKey, record: &IncidentRecord) -> Result<(), IndexError> {
    let body = serde_json::to_vec(record)?;
    let resp = self
      .client
      .put(self.doc_url(key))
      .header(reqwest::header::CONTENT_TYPE, "application/json")
      .body(body)
      .send()
      .await
      .map_err(transport)?;
    expect_success(resp).await
  }

  async fn exists(&self, key: &CorrelationKey) -> Result<(), IndexError> {
    let resp = self
      .client
      .get(self.doc_url(key))
      .query(&[("_source", "false")])
      .send()
      .await
      .map_err(transport)?;
    match resp.status() {
      s if s.is_success() => Ok(()),
      StatusCode::NOT_FOUND => Err(IndexError::not_found(key.as_str())),
      _ => Err(failure(resp).await),
    }
  }

  async fn delete(&self, key: &CorrelationKey) -> Result<(), IndexError> {
    let resp = self
      .client
      .delete(self.doc_url(key))
      .send()
      .await
      .map_err(transport)?;
    match resp.status() {
      // Already absent.
      StatusCode::NOT_FOUND => Ok(()),
      _ => expect_success(resp).await,
    }
  }
}
