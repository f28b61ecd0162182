//! JSON-lines driver: dispatches in, one outcome line per completed flow out.
//!
//! Flows run concurrently; outcome lines are written in completion order, not
//! input order. Invalid lines produce an `ErrorOutput` line and are skipped.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;

use crate::controller::IncidentController;
use crate::key;
use crate::types::{Dispatch, ErrorOutput, OutcomeOutput};

/// Relay every dispatch read from `input` until EOF, then wait for all
/// in-flight flows. Only I/O errors on `input`/`output` end the loop early.
pub async fn relay<R, W>(controller: &IncidentController, input: R, mut output: W) -> io::Result<()>
where
  R: AsyncBufRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let mut lines = input.lines();
  let mut in_flight = JoinSet::new();
  let mut eof = false;

  loop {
    tokio::select! {
      line = lines.next_line(), if !eof => {
        let line = match line? {
          Some(l) => l,
          None => {
            eof = true;
            continue;
          }
        };

        // Skip blank lines.
        let trimmed = line.trim();
        if trimmed.is_empty() {
          continue;
        }

        let dispatch: Dispatch = match serde_json::from_str(trimmed) {
          Ok(d) => d,
          Err(e) => {
            tracing::warn!(error = %e, "skipping malformed dispatch line");
            write_line(&mut output, &ErrorOutput::new(format!("json parse: {}", e))).await?;
            continue;
          }
        };

        let incident_key = key::derive(&dispatch.monitor.id, &dispatch.event.resource.id);
        let action = dispatch.action;
        let flow = controller.dispatch(&dispatch);
        in_flight.spawn(async move {
          match flow.await {
            Ok(outcome) => Some(OutcomeOutput { incident_key, action, outcome }),
            Err(e) => {
              tracing::error!(incident_key = %incident_key, error = %e, "flow aborted");
              None
            }
          }
        });
      }
      Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
        match done {
          Ok(Some(out)) => write_line(&mut output, &out).await?,
          Ok(None) => {}
          Err(e) => tracing::error!(error = %e, "outcome task aborted"),
        }
      }
      else => break,
    }
  }

  output.flush().await
}

async fn write_line<W, T>(output: &mut W, value: &T) -> io::Result<()>
where
  W: AsyncWrite + Unpin,
  T: Serialize,
{
  let mut buf = serde_json::to_vec(value)?;
  buf.push(b'\n');
  output.write_all(&buf).await
}
