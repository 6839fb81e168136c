//! Subscription registry and payload fan-out.

use crate::types::{Payload, WatchId};
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::types::{BroadcastOutcome, DropReason, WatchCallback, WatchEvent, WatchHandle};

/// Default per-subscriber channel capacity.
pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// Where a subscription's payloads go.
#[derive(Clone)]
enum Target {
    Callback(Arc<Mutex<WatchCallback>>),
    Channel(Sender<WatchEvent>),
}

/// Internal subscription state.
struct Subscription {
    target: Target,
    /// Cleared on removal so an in-flight fan-out skips this subscriber.
    active: Arc<AtomicBool>,
}

impl Subscription {
    fn new(target: Target) -> Self {
        Self {
            target,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Deactivate and tell channel subscribers why (best effort).
    fn retire(&self, reason: DropReason) {
        self.active.store(false, Ordering::SeqCst);
        if let Target::Channel(sender) = &self.target {
            let _ = sender.try_send(WatchEvent::Dropped { reason });
        }
    }
}

struct Registry {
    /// Active subscriptions by ID, iterated in ascending id order.
    subscriptions: BTreeMap<WatchId, Subscription>,
    /// Next id to hand out in the current epoch.
    next_id: WatchId,
}

/// Holds the active subscriptions and delivers payloads to them.
///
/// Ids are allocated from a counter that only moves forward until
/// [`clear`](Self::clear) starts a new epoch at zero. Removing a subscription
/// deletes it outright; ids of the others never shift.
pub struct SubscriptionManager {
    registry: RwLock<Registry>,
    /// Capacity of channel subscriptions.
    buffer_size: usize,
    /// Serializes fan-outs so payloads are handled one at a time.
    dispatch_lock: Mutex<()>,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new subscription manager with a custom channel capacity.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            registry: RwLock::new(Registry {
                subscriptions: BTreeMap::new(),
                next_id: WatchId(0),
            }),
            buffer_size: buffer_size.max(1),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Register a callback subscriber.
    pub fn insert_callback(&self, callback: WatchCallback) -> WatchId {
        self.insert(Target::Callback(Arc::new(Mutex::new(callback))))
    }

    /// Register a channel subscriber.
    pub fn insert_channel(&self) -> WatchHandle {
        let (sender, receiver) = bounded(self.buffer_size);
        let id = self.insert(Target::Channel(sender));
        WatchHandle { id, receiver }
    }

    fn insert(&self, target: Target) -> WatchId {
        let mut registry = self.registry.write();
        let id = registry.next_id;
        registry.next_id = id.next();
        registry.subscriptions.insert(id, Subscription::new(target));
        id
    }

    /// Remove a subscription. Returns false if the id was not active.
    pub fn remove(&self, id: WatchId) -> bool {
        let removed = self.registry.write().subscriptions.remove(&id);
        match removed {
            Some(sub) => {
                sub.retire(DropReason::Unsubscribed);
                true
            }
            None => false,
        }
    }

    /// Remove every subscription and restart id allocation at zero.
    ///
    /// Returns the number of subscriptions removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut registry = self.registry.write();
            registry.next_id = WatchId(0);
            std::mem::take(&mut registry.subscriptions)
        };

        for sub in removed.values() {
            sub.retire(DropReason::Stopped);
        }
        removed.len()
    }

    pub fn contains(&self, id: WatchId) -> bool {
        self.registry.read().subscriptions.contains_key(&id)
    }

    /// Get subscription count.
    pub fn len(&self) -> usize {
        self.registry.read().subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.read().subscriptions.is_empty()
    }

    /// Active ids in ascending order.
    pub fn ids(&self) -> Vec<WatchId> {
        self.registry.read().subscriptions.keys().copied().collect()
    }

    /// The id the next subscription will get.
    pub fn next_id(&self) -> WatchId {
        self.registry.read().next_id
    }

    // --- Broadcasting ---

    /// Deliver one payload to every active subscriber, in id order.
    ///
    /// Callbacks run without the registry lock held, so they may add or
    /// remove subscriptions. A callback must not broadcast itself.
    /// Channel subscribers that cannot take the payload are removed.
    pub fn broadcast(&self, payload: &Payload) -> BroadcastOutcome {
        let _guard = self.dispatch_lock.lock();

        let targets: Vec<(WatchId, Target, Arc<AtomicBool>)> = {
            let registry = self.registry.read();
            registry
                .subscriptions
                .iter()
                .map(|(id, sub)| (*id, sub.target.clone(), Arc::clone(&sub.active)))
                .collect()
        };

        let mut outcome = BroadcastOutcome::default();
        let mut failed = Vec::new();

        for (id, target, active) in targets {
            if !active.load(Ordering::SeqCst) {
                continue;
            }
            match target {
                Target::Callback(callback) => {
                    let mut callback = callback.lock();
                    (*callback)(payload);
                    outcome.delivered += 1;
                }
                Target::Channel(sender) => {
                    match sender.try_send(WatchEvent::Sample { payload: *payload }) {
                        Ok(()) => outcome.delivered += 1,
                        Err(TrySendError::Full(_)) => {
                            failed.push((id, active, DropReason::BufferOverflow))
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            failed.push((id, active, DropReason::Disconnected))
                        }
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut registry = self.registry.write();
            for (id, active, reason) in failed {
                // The id may belong to a newer epoch by now.
                let same = registry
                    .subscriptions
                    .get(&id)
                    .is_some_and(|sub| Arc::ptr_eq(&sub.active, &active));
                if !same {
                    continue;
                }
                if let Some(sub) = registry.subscriptions.remove(&id) {
                    tracing::warn!(watch_id = %id, ?reason, "dropping subscriber");
                    sub.retire(reason);
                    outcome.dropped.push(id);
                }
            }
        }

        outcome
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
