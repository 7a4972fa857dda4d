use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::session::SessionRecord;

/// Callback invoked with the full session list after every mutation.
pub type SnapshotCallback = Box<dyn Fn(&[SessionRecord]) + Send + Sync>;

/// Handle identifying one subscription. Subscribing the same closure twice
/// yields two distinct handles; removal is always by handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Set of snapshot listeners, notified in registration order.
///
/// Handles are assigned from a monotonic counter and the map is ordered by
/// handle, so iteration order equals registration order. A panicking
/// listener is caught, logged, and skipped; it stays registered and the
/// remaining listeners are still notified.
pub struct SnapshotSubscribers {
    next_id: u64,
    listeners: BTreeMap<u64, SnapshotCallback>,
}

impl SnapshotSubscribers {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            listeners: BTreeMap::new(),
        }
    }

    pub fn subscribe(&mut self, callback: SnapshotCallback) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.insert(id, callback);
        tracing::debug!(subscription_id = id, "Subscriber registered");
        SubscriptionId(id)
    }

    /// Removes a subscription. Unknown handles are a no-op returning false.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let removed = self.listeners.remove(&id.0).is_some();
        if removed {
            tracing::debug!(subscription_id = id.0, "Subscriber removed");
        }
        removed
    }

    /// Delivers the given snapshot to every listener, oldest first.
    pub fn notify(&self, sessions: &[SessionRecord]) {
        for (id, callback) in &self.listeners {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| callback(sessions))) {
                tracing::warn!(
                    subscription_id = id,
                    panic = ?panic_err,
                    "Subscriber panicked during notification, skipping"
                );
            }
        }
    }

    /// Delivers a snapshot to a single listener, with the same panic
    /// isolation as [`notify`](Self::notify).
    pub fn notify_one(&self, id: SubscriptionId, sessions: &[SessionRecord]) {
        if let Some(callback) = self.listeners.get(&id.0) {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| callback(sessions))) {
                tracing::warn!(
                    subscription_id = id.0,
                    panic = ?panic_err,
                    "Subscriber panicked during notification, skipping"
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Default for SnapshotSubscribers {
    fn default() -> Self {
        Self::new()
    }
}
