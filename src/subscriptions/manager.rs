//! Subscription manager for broadcasting change events.

use crate::error::{HistoryError, Result};
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{
    ChangeEvent, DropReason, HistoryEvent, Observer, ObserverError, SubscriptionConfig,
    SubscriptionHandle, SubscriptionId,
};

/// Internal channel subscription state.
struct Subscription {
    sender: Sender<HistoryEvent>,
}

impl Subscription {
    /// Try to send an event. Returns the drop reason if the subscriber must go.
    fn try_send(&self, event: HistoryEvent) -> std::result::Result<(), DropReason> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(crossbeam_channel::TrySendError::Full(_)) => Err(DropReason::BufferOverflow),
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                Err(DropReason::Disconnected)
            }
        }
    }
}

/// Manages observers and channel subscriptions for one view.
///
/// Observers run synchronously in registration order. Channel subscribers
/// receive events through bounded buffers and are dropped when a buffer
/// fills up.
pub struct SubscriptionManager {
    /// Observers in registration order.
    observers: RwLock<Vec<(SubscriptionId, Observer)>>,
    /// Channel subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a synchronous observer.
    pub fn on_change<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) -> std::result::Result<(), ObserverError> + Send + Sync + 'static,
    {
        let id = self.next_id();
        let observer: Observer = Arc::new(observer);
        self.observers.write().push((id, observer));
        id
    }

    /// Create a channel subscription.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = self.next_id();
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        self.subscriptions.write().insert(id, Subscription { sender });

        SubscriptionHandle { id, receiver }
    }

    /// Remove an observer or channel subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        {
            let mut observers = self.observers.write();
            if let Some(position) = observers.iter().position(|(oid, _)| *oid == id) {
                observers.remove(position);
                return true;
            }
        }

        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Send dropped event (best effort)
            let _ = sub.try_send(HistoryEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
            return true;
        }
        false
    }

    /// Number of observers plus channel subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.observers.read().len() + self.subscriptions.read().len()
    }

    /// Deliver a change to channel subscribers, then to observers in order.
    ///
    /// Observers are called without any lock held, so they may register or
    /// remove subscriptions. The first observer error stops delivery of this
    /// event and is returned.
    pub fn notify(&self, change: &ChangeEvent) -> Result<()> {
        self.broadcast(HistoryEvent::Change {
            change: change.clone(),
        });

        let observers: Vec<(SubscriptionId, Observer)> = self.observers.read().clone();
        for (id, observer) in observers {
            if let Err(e) = observer(change) {
                tracing::warn!(observer = id.0, error = %e, "observer failed, delivery aborted");
                return Err(HistoryError::Observer {
                    id,
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Internal broadcast helper. Drops subscribers that fail to receive.
    fn broadcast(&self, event: HistoryEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if let Err(reason) = sub.try_send(event.clone()) {
                    to_remove.push((*id, reason));
                }
            }
        }

        // Remove dropped subscriptions
        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for (id, reason) in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    tracing::debug!(subscription = id.0, ?reason, "dropped subscriber");
                    // Try to notify about the drop (might fail, that's ok)
                    let _ = sub.sender.try_send(HistoryEvent::Dropped { reason });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
