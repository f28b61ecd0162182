//! Binary entrypoint: read dispatch JSON lines from stdin, write outcome JSON
//! lines to stdout. Logs go to stderr (`RUST_LOG`, default `info`).
//!
//! Each input line is a Dispatch. Output lines are either:
//! - An OutcomeOutput (when a trigger/resolve flow completes)
//! - An ErrorOutput (when the line is not a valid dispatch)

use std::io::{self, Write};
use std::sync::Arc;

use incident_relay::{
  Config, CorrelationIndex, DocumentStoreIndex, HttpAlertSender, IncidentController, MemoryIndex,
};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();

  if let Err(e) = run().await {
    let _ = writeln!(io::stderr(), "incident-relay error: {}", e);
    std::process::exit(1);
  }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
  let config = Arc::new(Config::from_env()?);

  let index: Arc<dyn CorrelationIndex> = if config.index_url == "memory" {
    tracing::warn!("using in-memory correlation index; open incidents are forgotten on exit");
    Arc::new(MemoryIndex::new())
  } else {
    let store = DocumentStoreIndex::new(&config.index_url, &config.index_name, config.timeout)?;
    // Not fatal: lookups against a missing index still read as "not found".
    if let Err(e) = store.require_template(config.record_ttl).await {
      tracing::warn!(index = store.index_name(), error = %e, "index template not installed");
    }
    match store.purge_expired(chrono::Utc::now()).await {
      Ok(0) => {}
      Ok(n) => tracing::info!(index = store.index_name(), purged = n, "expired correlation records purged"),
      Err(e) => tracing::warn!(index = store.index_name(), error = %e, "expired record purge failed"),
    }
    Arc::new(store)
  };

  let sender = Arc::new(HttpAlertSender::new(&config)?);
  let controller = IncidentController::new(config.clone(), sender, index);

  tracing::info!(api_url = %config.api_url, index_url = %config.index_url, "incident-relay started");
  incident_relay::stream::relay(&controller, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    .await?;
  Ok(())
}
