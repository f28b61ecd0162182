//! Incident Relay — alert-lifecycle reconciliation.
//!
//! Opens one remote incident per violation episode and closes it when the
//! episode ends. Episodes are identified by a correlation key derived from the
//! (monitor, resource) pair; a document-store index records which episodes
//! currently have an open incident, and is only mutated after the remote API
//! has accepted the call.
//!
//! No error reaches the dispatcher: every failure ends in a log entry and an
//! [`Outcome`].

pub mod alert;
pub mod config;
pub mod controller;
pub mod docstore;
pub mod error;
pub mod index;
pub mod key;
pub mod keylock;
pub mod stream;
pub mod types;

pub use alert::{AlertSender, HttpAlertSender};
pub use config::Config;
pub use controller::IncidentController;
pub use docstore::DocumentStoreIndex;
pub use error::{AlertError, ConfigError, IndexError};
pub use index::{CorrelationIndex, MemoryIndex};
pub use types::{CorrelationKey, Dispatch, Event, IncidentRecord, Monitor, Outcome, Settings};
