//! Preference - typed live handle on one store key
//!
//! A preference is a view, not a cache: every read goes to the store, and
//! every committed write is published so that all handles on the same key
//! (and anything else subscribed to it) re-read and re-emit.

use crate::adapter::ValueAdapter;
use crate::error::{PrefsError, Result};
use crate::notifier::{ChangeNotifier, Subscription};
use crate::observable::{Listener, Observable};
use crate::store::KeyValueStore;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, warn};

/// Typed, live view of the value stored under one key
///
/// Handles are cheap to clone. Two handles are equal when they share a key,
/// whatever their current values.
///
/// Every publish of the key re-emits the freshly read value, even when it
/// equals the previous emission: an emission means "a write happened", not
/// "the value changed".
pub struct Preference<T> {
    key: String,
    default: T,
    adapter: Arc<dyn ValueAdapter<T>>,
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
}

impl<T> Preference<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a handle; performs no I/O
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::EmptyKey`] if `key` is empty.
    pub fn new(
        key: impl Into<String>,
        default: T,
        adapter: Arc<dyn ValueAdapter<T>>,
        store: Arc<dyn KeyValueStore>,
        notifier: ChangeNotifier,
    ) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(PrefsError::EmptyKey);
        }

        Ok(Self {
            key,
            default,
            adapter,
            store,
            notifier,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Stored value, or the default when it is absent or unreadable
    pub fn get(&self) -> T {
        match self.adapter.read(self.store.as_ref(), &self.key) {
            Some(value) => value,
            None => self.default.clone(),
        }
    }

    /// Whether the store holds anything under this key
    pub fn is_set(&self) -> bool {
        self.store.contains_key(&self.key)
    }

    /// Write `value` and publish the change
    ///
    /// Returns whether the store committed the write. Nothing is published
    /// for an uncommitted write.
    pub fn set(&self, value: T) -> bool {
        let committed = self
            .adapter
            .write(self.store.as_ref(), &self.key, Some(&value));
        self.announce(committed, "set")
    }

    /// Remove the key and publish the change
    ///
    /// Reads fall back to the default afterwards.
    pub fn clear(&self) -> bool {
        let committed = self.adapter.write(self.store.as_ref(), &self.key, None);
        self.announce(committed, "clear")
    }

    fn announce(&self, committed: bool, op: &str) -> bool {
        if committed {
            debug!("{} '{}' committed", op, self.key);
            self.notifier.publish(&self.key);
        } else {
            warn!("{} '{}' was not committed by the store", op, self.key);
        }
        committed
    }
}

impl<T> Observable for Preference<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn observe_with(&self, listener: Listener<T>) -> Subscription {
        listener(self.get());

        let view = self.clone();
        self.notifier
            .subscribe(&self.key, move |_key| listener(view.get()))
    }
}

impl<T: Clone> Clone for Preference<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            default: self.default.clone(),
            adapter: Arc::clone(&self.adapter),
            store: Arc::clone(&self.store),
            notifier: self.notifier.clone(),
        }
    }
}

impl<T> PartialEq for Preference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Preference<T> {}

impl<T> Hash for Preference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Preference<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preference")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("kind", &self.adapter.kind())
            .finish()
    }
}
