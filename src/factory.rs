//! PreferenceFactory - builds typed preferences over one store and notifier
//!
//! The factory is a thin coordinator. It hands every preference the same
//! store and the same [`ChangeNotifier`], so handles created from it observe
//! each other's writes. It also owns the store-wide operations that have no
//! single preference to live on: removing keys, clearing the store, applying
//! a seed, and the live set of keys.

use crate::adapter::{
    BoolAdapter, FloatAdapter, IntAdapter, StringAdapter, StringListAdapter, ValueAdapter,
};
use crate::error::Result;
use crate::notifier::{ChangeNotifier, Subscription};
use crate::observable::{Listener, Observable};
use crate::preference::Preference;
use crate::store::{KeyValueStore, Primitive};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates [`Preference`] handles sharing one store and one notifier
#[derive(Clone)]
pub struct PreferenceFactory {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
}

impl PreferenceFactory {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self { store, notifier }
    }

    /// Factory with a fresh notifier of its own
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, ChangeNotifier::new())
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    // =========================================================================
    // Typed constructors
    // =========================================================================

    pub fn get_bool(&self, key: &str, default: bool) -> Result<Preference<bool>> {
        self.get_custom_value(key, default, BoolAdapter)
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<Preference<i64>> {
        self.get_custom_value(key, default, IntAdapter)
    }

    pub fn get_double(&self, key: &str, default: f64) -> Result<Preference<f64>> {
        self.get_custom_value(key, default, FloatAdapter)
    }

    pub fn get_string(&self, key: &str, default: impl Into<String>) -> Result<Preference<String>> {
        self.get_custom_value(key, default.into(), StringAdapter)
    }

    pub fn get_string_list(
        &self,
        key: &str,
        default: Vec<String>,
    ) -> Result<Preference<Vec<String>>> {
        self.get_custom_value(key, default, StringListAdapter)
    }

    /// Preference over any type, converted by `adapter`
    ///
    /// # Errors
    ///
    /// Returns [`crate::PrefsError::EmptyKey`] if `key` is empty.
    pub fn get_custom_value<T, A>(&self, key: &str, default: T, adapter: A) -> Result<Preference<T>>
    where
        T: Clone + Send + Sync + 'static,
        A: ValueAdapter<T> + 'static,
    {
        Preference::new(
            key,
            default,
            Arc::new(adapter),
            Arc::clone(&self.store),
            self.notifier.clone(),
        )
    }

    // =========================================================================
    // Store-wide operations
    // =========================================================================

    /// Live set of keys present in the store
    pub fn keys(&self) -> KeySet {
        KeySet {
            store: Arc::clone(&self.store),
            notifier: self.notifier.clone(),
        }
    }

    /// Remove `key` and publish the change if the store committed it
    pub fn remove(&self, key: &str) -> bool {
        let committed = self.store.remove(key);
        if committed {
            debug!("Removed '{}'", key);
            self.notifier.publish(key);
        } else {
            warn!("Removal of '{}' was not committed by the store", key);
        }
        committed
    }

    /// Remove every key, publishing each committed removal
    ///
    /// Returns `true` only if every removal committed.
    pub fn clear(&self) -> bool {
        let keys = self.store.keys();
        let total = keys.len();
        let committed = keys.iter().filter(|key| self.remove(key)).count();
        info!("Cleared {}/{} keys", committed, total);
        committed == total
    }

    /// Announce a change made to the shared store by someone else
    pub fn notify_external_change(&self, key: &str) {
        self.notifier.publish(key);
    }

    /// Write a batch of values, publishing each committed key
    ///
    /// Returns the number of committed writes.
    pub fn apply_seed(&self, seed: &BTreeMap<String, Primitive>) -> usize {
        let mut committed = 0;
        for (key, value) in seed {
            if self.store.set_primitive(key, value) {
                committed += 1;
                self.notifier.publish(key);
            } else {
                warn!("Seed value for '{}' was not committed", key);
            }
        }
        debug!("Applied seed ({}/{} committed)", committed, seed.len());
        committed
    }
}

impl std::fmt::Debug for PreferenceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceFactory")
            .field("notifier", &self.notifier)
            .finish()
    }
}

/// Live, read-only view of the keys present in the store
///
/// Re-emits the full key set on every publish, whatever the key.
#[derive(Clone)]
pub struct KeySet {
    store: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
}

impl KeySet {
    pub fn get(&self) -> BTreeSet<String> {
        self.store.keys()
    }
}

impl Observable for KeySet {
    type Item = BTreeSet<String>;

    fn observe_with(&self, listener: Listener<BTreeSet<String>>) -> Subscription {
        listener(self.get());

        let store = Arc::clone(&self.store);
        self.notifier
            .subscribe_all(move |_key| listener(store.keys()))
    }
}
