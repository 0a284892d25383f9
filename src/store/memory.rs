//! MemoryStore - in-process key-value store
//!
//! Keeps every value in a single map guarded by a `parking_lot::RwLock`.
//! Writes always commit. Used by the `live-prefs` shell and by tests.

use super::{KeyValueStore, Primitive};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// In-memory store holding one [`Primitive`] per key
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Primitive>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load entries without announcing them
    ///
    /// Used to restore seed values at startup, before any live handle
    /// exists. Nobody is notified; callers that need notification go through
    /// [`crate::PreferenceFactory::apply_seed`] instead.
    pub fn hydrate<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, Primitive)>,
    {
        let mut values = self.values.write();
        let before = values.len();
        values.extend(entries);
        debug!("Hydrated memory store ({} -> {} keys)", before, values.len());
    }

    /// Copy of every entry, sorted by key
    pub fn snapshot(&self) -> Vec<(String, Primitive)> {
        let mut entries: Vec<_> = self
            .values
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    fn insert(&self, key: &str, value: Primitive) -> bool {
        self.values.write().insert(key.to_string(), value);
        true
    }
}

impl KeyValueStore for MemoryStore {
    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.read().get(key) {
            Some(Primitive::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.read().get(key) {
            Some(Primitive::Int(i)) => Some(*i),
            _ => None,
        }
    }

    fn get_double(&self, key: &str) -> Option<f64> {
        match self.values.read().get(key) {
            Some(Primitive::Float(x)) => Some(*x),
            _ => None,
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.values.read().get(key) {
            Some(Primitive::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.values.read().get(key) {
            Some(Primitive::StringList(list)) => Some(list.clone()),
            _ => None,
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> bool {
        self.insert(key, Primitive::Bool(value))
    }

    fn set_int(&self, key: &str, value: i64) -> bool {
        self.insert(key, Primitive::Int(value))
    }

    fn set_double(&self, key: &str, value: f64) -> bool {
        self.insert(key, Primitive::Float(value))
    }

    fn set_string(&self, key: &str, value: &str) -> bool {
        self.insert(key, Primitive::String(value.to_string()))
    }

    fn set_string_list(&self, key: &str, value: &[String]) -> bool {
        self.insert(key, Primitive::StringList(value.to_vec()))
    }

    fn remove(&self, key: &str) -> bool {
        self.values.write().remove(key);
        true
    }

    fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    fn keys(&self) -> BTreeSet<String> {
        self.values.read().keys().cloned().collect()
    }
}
