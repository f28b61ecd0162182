//! Optional per-key serialization of trigger/resolve flows within one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use crate::types::CorrelationKey;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// One async mutex per correlation key, created on demand and dropped once no
/// flow holds or waits for it.
#[derive(Debug, Default)]
pub struct KeyLocks {
  slots: Mutex<HashMap<CorrelationKey, Slot>>,
}

/// Held for the duration of one flow.
pub struct KeyGuard<'a> {
  locks: &'a KeyLocks,
  key: CorrelationKey,
  guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn acquire(&self, key: &CorrelationKey) -> KeyGuard<'_> {
    let slot = {
      let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
      slots.entry(key.clone()).or_default().clone()
    };
    let guard = slot.lock_owned().await;
    KeyGuard {
      locks: self,
      key: key.clone(),
      guard: Some(guard),
    }
  }

  /// Number of keys currently locked or awaited.
  pub fn active(&self) -> usize {
    self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
  }
}

impl Drop for KeyGuard<'_> {
  fn drop(&mut self) {
    self.guard.take();
    let mut slots = self.locks.slots.lock().unwrap_or_else(|e| e.into_inner());
    // Only the map holds the slot: nobody is waiting on it.
    let idle = slots
      .get(&self.key)
      .map(|slot| Arc::strong_count(slot) == 1)
      .unwrap_or(false);
    if idle {
      slots.remove(&self.key);
    }
  }
}
