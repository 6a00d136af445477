use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Opaque identity of a connected observer, stable for the connection's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Live mapping from observer identity to its active category filter.
///
/// Shared between the real-time connection handler (mutation) and the fan-out
/// dispatcher (iteration via [`snapshot`](Self::snapshot)). An entry added or
/// removed while a snapshot is taken may or may not appear in it, but a
/// snapshot never observes a torn entry.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<ObserverId, Option<String>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly connected observer with no filter set yet.
    pub fn register(&self, observer: ObserverId) {
        self.write().insert(observer, None);
    }

    /// Set or replace the observer's category filter. A later subscribe call
    /// from the same observer replaces, not appends.
    pub fn set_filter(&self, observer: ObserverId, category: String) {
        self.write().insert(observer, Some(category));
    }

    /// Remove the observer. Driven solely by disconnect notifications.
    pub fn remove(&self, observer: &ObserverId) {
        self.write().remove(observer);
    }

    /// Consistent-enough copy of the current entries for one dispatch cycle.
    pub fn snapshot(&self) -> Vec<(ObserverId, Option<String>)> {
        self.read()
            .iter()
            .map(|(id, filter)| (*id, filter.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A poisoned lock only means another thread panicked mid-write of a
    // HashMap entry, which cannot leave a torn value; keep serving.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ObserverId, Option<String>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ObserverId, Option<String>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
