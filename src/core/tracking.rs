//! Explicit change tracking
//!
//! An `EntityStore` remembers a snapshot of every entity it hands out with
//! [`TrackingMode::Tracked`]. Nothing is written back implicitly: the caller
//! passes the entity to `save`, which writes only when the entity differs
//! from its snapshot. `Detached` reads never enter the tracker, so a caller
//! can build a fresh write model from them without any risk of collision.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Whether a fetched entity is wired for write-back through `save`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackingMode {
    #[default]
    Tracked,
    Detached,
}

/// Identity -> last known persisted row
#[derive(Debug, Default)]
pub struct ChangeTracker {
    snapshots: Mutex<HashMap<i64, Value>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshots(&self) -> MutexGuard<'_, HashMap<i64, Value>> {
        // snapshots are plain data, a panic elsewhere cannot leave them half-written
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn track(&self, id: i64, row: Value) {
        self.snapshots().insert(id, row);
    }

    /// Refresh the snapshot only if the identity is already tracked
    pub fn refresh(&self, id: i64, row: Value) {
        if let Some(snapshot) = self.snapshots().get_mut(&id) {
            *snapshot = row;
        }
    }

    pub fn untrack(&self, id: i64) {
        self.snapshots().remove(&id);
    }

    pub fn is_tracked(&self, id: i64) -> bool {
        self.snapshots().contains_key(&id)
    }

    pub fn snapshot(&self, id: i64) -> Option<Value> {
        self.snapshots().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
