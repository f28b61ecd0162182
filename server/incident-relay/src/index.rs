//! Correlation index capability and an in-process implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::IndexError;
use crate::types::{CorrelationKey, IncidentRecord};

/// Key/value store of open incidents, keyed by correlation key.
///
/// `exists` must return `IndexError::NotFound` for an absent key (including an
/// index that was never created) and a different variant for every other
/// failure.
#[async_trait]
pub trait CorrelationIndex: Send + Sync {
  /// Create or overwrite the record at `key`.
  async fn put(&self, key: &CorrelationKey, record: &IncidentRecord) -> Result<(), IndexError>;

  /// Existence check without fetching the stored body.
  async fn exists(&self, key: &CorrelationKey) -> Result<(), IndexError>;

  async fn delete(&self, key: &CorrelationKey) -> Result<(), IndexError>;
}

/// In-memory index. Never fails on its own.
#[derive(Debug, Default)]
pub struct MemoryIndex {
  records: Mutex<HashMap<CorrelationKey, IncidentRecord>>,
}

impl MemoryIndex {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &CorrelationKey) -> Option<IncidentRecord> {
    self.lock().get(key).cloned()
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CorrelationKey, IncidentRecord>> {
    // A poisoned map is still a consistent map: every mutation is a single insert/remove.
    self.records.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[async_trait]
impl CorrelationIndex for MemoryIndex {
  async fn put(&self, key: &CorrelationKey, record: &IncidentRecord) -> Result<(), IndexError> {
    self.lock().insert(key.clone(), record.clone());
    Ok(())
  }

  async fn exists(&self, key: &CorrelationKey) -> Result<(), IndexError> {
    if self.lock().contains_key(key) {
      Ok(())
    } else {
      Err(IndexError::not_found(key.as_str()))
    }
  }

  async fn delete(&self, key: &CorrelationKey) -> Result<(), IndexError> {
    self.lock().remove(key);
    Ok(())
  }
}
