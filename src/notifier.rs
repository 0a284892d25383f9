//! ChangeNotifier - shared multicast point for "this key changed" events
//!
//! Every writer (a [`crate::Preference`], the factory, or an external writer
//! sharing the store) publishes the key it touched; every interested party
//! subscribes to the keys it cares about. Events carry no value: listeners
//! re-read the store, which stays the single source of truth.
//!
//! Delivery is synchronous. `publish` calls every listener subscribed at the
//! moment of the call, in registration order, before it returns. The
//! listener list is snapshotted first and the lock is released before any
//! callback runs, so listeners may subscribe or unsubscribe freely:
//!   - a listener removed during a publish is still called in that round
//!   - a listener added during a publish is first called on the next one
//!   - a cancelled listener is released after the lock, so it may own
//!     subscriptions of its own
//!
//! A listener that panics is logged and skipped; the remaining listeners
//! are still called and `publish` itself returns normally.

use crate::observable::LiveStream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, trace};

/// Identifier assigned to each registered listener
pub type ListenerId = u64;

type KeyListener = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Registry {
    /// Listeners scoped to a single key
    by_key: HashMap<String, Vec<(ListenerId, KeyListener)>>,
    /// Listeners interested in every key
    any_key: Vec<(ListenerId, KeyListener)>,
}

struct Shared {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

/// Process-wide (per store) change multiplexer
///
/// Cheap to clone; clones share the same listener registry.
#[derive(Clone)]
pub struct ChangeNotifier {
    shared: Arc<Shared>,
}

impl ChangeNotifier {
    /// Create a notifier with no listeners
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Announce that `key` may have changed
    pub fn publish(&self, key: &str) {
        let snapshot: Vec<(ListenerId, KeyListener)> = {
            let registry = self.shared.registry.lock();
            registry
                .by_key
                .get(key)
                .into_iter()
                .flatten()
                .chain(registry.any_key.iter())
                .map(|(id, listener)| (*id, Arc::clone(listener)))
                .collect()
        };

        debug!("Publishing change for '{}' to {} listener(s)", key, snapshot.len());

        for (id, listener) in snapshot {
            trace!("Delivering '{}' to listener {}", key, id);
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(key))) {
                error!(
                    "Listener {} panicked while handling change of '{}': {}",
                    id,
                    key,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Call `listener` on every future publish of `key`
    ///
    /// Nothing is replayed: a publish that happened before this call is
    /// never delivered. Dropping the returned [`Subscription`] stops delivery.
    pub fn subscribe<F>(&self, key: &str, listener: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.shared
            .registry
            .lock()
            .by_key
            .entry(key.to_string())
            .or_default()
            .push((id, Arc::new(listener)));

        let shared = Arc::downgrade(&self.shared);
        let key = key.to_string();
        Subscription::new(move || {
            if let Some(shared) = Weak::upgrade(&shared) {
                let removed = {
                    let mut registry = shared.registry.lock();
                    let removed = registry
                        .by_key
                        .get_mut(&key)
                        .and_then(|listeners| detach(listeners, id));
                    if registry.by_key.get(&key).is_some_and(Vec::is_empty) {
                        registry.by_key.remove(&key);
                    }
                    removed
                };
                // Dropped unlocked: the listener may own subscriptions of its own
                drop(removed);
            }
        })
    }

    /// Call `listener` on every future publish, whatever the key
    pub fn subscribe_all<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.shared
            .registry
            .lock()
            .any_key
            .push((id, Arc::new(listener)));

        let shared = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = Weak::upgrade(&shared) {
                let removed = detach(&mut shared.registry.lock().any_key, id);
                drop(removed);
            }
        })
    }

    /// Live sequence of unit events, one per publish of `key`
    pub fn changes(&self, key: &str) -> LiveStream<()> {
        LiveStream::attach(|listener| self.subscribe(key, move |_| listener(())))
    }

    /// Number of listeners currently subscribed to exactly `key`
    pub fn listener_count(&self, key: &str) -> usize {
        self.shared
            .registry
            .lock()
            .by_key
            .get(key)
            .map_or(0, Vec::len)
    }

    fn next_id(&self) -> ListenerId {
        self.shared.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.shared.registry.lock();
        f.debug_struct("ChangeNotifier")
            .field("keys", &registry.by_key.len())
            .field("any_key_listeners", &registry.any_key.len())
            .finish()
    }
}

/// Take listener `id` out of `listeners` without dropping it
fn detach(listeners: &mut Vec<(ListenerId, KeyListener)>, id: ListenerId) -> Option<KeyListener> {
    let pos = listeners.iter().position(|(lid, _)| *lid == id)?;
    Some(listeners.remove(pos).1)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Handle to an active subscription
///
/// Dropping it (or calling [`Subscription::unsubscribe`]) cancels delivery.
/// A subscription built with [`Subscription::merge`] cancels all of its
/// parts at once.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    cancels: Vec<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Subscription whose cancellation runs `cancel`
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancels: vec![Box::new(cancel)],
        }
    }

    /// Subscription that cancels nothing
    pub fn empty() -> Self {
        Self { cancels: Vec::new() }
    }

    /// Combine several subscriptions into one
    pub fn merge<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Subscription>,
    {
        let mut cancels = Vec::new();
        for mut part in parts {
            cancels.append(&mut part.cancels);
        }
        Self { cancels }
    }

    /// Stop delivery now
    pub fn unsubscribe(self) {}

    /// Whether dropping this handle would cancel anything
    pub fn is_active(&self) -> bool {
        !self.cancels.is_empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for cancel in self.cancels.drain(..) {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("parts", &self.cancels.len())
            .finish()
    }
}
