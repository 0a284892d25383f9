//! Value adapters - conversion between domain types and store primitives
//!
//! An adapter is a stateless pair of pure functions. `decode` turns a stored
//! primitive into `T` (or `None` when the data cannot be understood), and
//! `encode` turns `T` into the primitive to store. The provided `read` and
//! `write` methods perform the single store call an adapter is allowed to
//! make.

mod datetime;
mod json;

use crate::store::{KeyValueStore, Primitive, PrimitiveKind};

pub use datetime::DateTimeAdapter;
pub use json::JsonAdapter;

/// Bidirectional converter between `T` and one primitive kind
pub trait ValueAdapter<T>: Send + Sync {
    /// The primitive kind values are stored as
    fn kind(&self) -> PrimitiveKind;

    /// Decode a stored primitive. Unreadable data decodes to `None`.
    fn decode(&self, raw: Primitive) -> Option<T>;

    /// Encode a value, or `None` when it has no stored representation
    fn encode(&self, value: &T) -> Option<Primitive>;

    /// Read and decode `key`; absent, mismatched or unreadable data is `None`
    fn read(&self, store: &dyn KeyValueStore, key: &str) -> Option<T> {
        store
            .get_primitive(key, self.kind())
            .and_then(|raw| self.decode(raw))
    }

    /// Encode and write `value`; writing `None` removes the key
    ///
    /// Returns whether the store committed the write. A value that cannot
    /// be encoded is never written and reports `false`.
    fn write(&self, store: &dyn KeyValueStore, key: &str, value: Option<&T>) -> bool {
        match value {
            Some(value) => match self.encode(value) {
                Some(raw) => store.set_primitive(key, &raw),
                None => false,
            },
            None => store.remove(key),
        }
    }
}

/// Stores `bool` as a native boolean
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolAdapter;

impl ValueAdapter<bool> for BoolAdapter {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Bool
    }

    fn decode(&self, raw: Primitive) -> Option<bool> {
        match raw {
            Primitive::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn encode(&self, value: &bool) -> Option<Primitive> {
        Some(Primitive::Bool(*value))
    }
}

/// Stores `i64` as a native integer
#[derive(Debug, Clone, Copy, Default)]
pub struct IntAdapter;

impl ValueAdapter<i64> for IntAdapter {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Int
    }

    fn decode(&self, raw: Primitive) -> Option<i64> {
        match raw {
            Primitive::Int(i) => Some(i),
            _ => None,
        }
    }

    fn encode(&self, value: &i64) -> Option<Primitive> {
        Some(Primitive::Int(*value))
    }
}

/// Stores `f64` as a native double
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatAdapter;

impl ValueAdapter<f64> for FloatAdapter {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Float
    }

    fn decode(&self, raw: Primitive) -> Option<f64> {
        match raw {
            Primitive::Float(x) => Some(x),
            _ => None,
        }
    }

    fn encode(&self, value: &f64) -> Option<Primitive> {
        Some(Primitive::Float(*value))
    }
}

/// Stores `String` as a native string
#[derive(Debug, Clone, Copy, Default)]
pub struct StringAdapter;

impl ValueAdapter<String> for StringAdapter {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::String
    }

    fn decode(&self, raw: Primitive) -> Option<String> {
        match raw {
            Primitive::String(s) => Some(s),
            _ => None,
        }
    }

    fn encode(&self, value: &String) -> Option<Primitive> {
        Some(Primitive::String(value.clone()))
    }
}

/// Stores `Vec<String>` as the store's native ordered list
#[derive(Debug, Clone, Copy, Default)]
pub struct StringListAdapter;

impl ValueAdapter<Vec<String>> for StringListAdapter {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::StringList
    }

    fn decode(&self, raw: Primitive) -> Option<Vec<String>> {
        match raw {
            Primitive::StringList(list) => Some(list),
            _ => None,
        }
    }

    fn encode(&self, value: &Vec<String>) -> Option<Primitive> {
        Some(Primitive::StringList(value.clone()))
    }
}
