//! Store boundary - the flat synchronous key-value store this crate observes
//!
//! The store is the single source of truth. It exposes typed get/set
//! primitives per native kind, plus removal and key enumeration. Every
//! operation is synchronous and total: a missing key (or a key holding a
//! different primitive kind) reads as `None`, never as an error.

pub mod memory;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use memory::MemoryStore;

/// A value in one of the store's native representations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    /// Boolean flag
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// Double-precision float
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of strings, stored natively (not joined into one string)
    StringList(Vec<String>),
}

impl Primitive {
    /// The kind tag of this value
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Bool(_) => PrimitiveKind::Bool,
            Primitive::Int(_) => PrimitiveKind::Int,
            Primitive::Float(_) => PrimitiveKind::Float,
            Primitive::String(_) => PrimitiveKind::String,
            Primitive::StringList(_) => PrimitiveKind::StringList,
        }
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive::Bool(b) => write!(f, "{}", b),
            Primitive::Int(i) => write!(f, "{}", i),
            Primitive::Float(x) => write!(f, "{}", x),
            Primitive::String(s) => write!(f, "{:?}", s),
            Primitive::StringList(list) => write!(f, "{:?}", list),
        }
    }
}

/// Native primitive kinds supported by a [`KeyValueStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveKind {
    Bool,
    Int,
    Float,
    String,
    StringList,
}

impl PrimitiveKind {
    /// All kinds, in declaration order
    pub fn all() -> &'static [PrimitiveKind] {
        &[
            PrimitiveKind::Bool,
            PrimitiveKind::Int,
            PrimitiveKind::Float,
            PrimitiveKind::String,
            PrimitiveKind::StringList,
        ]
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bool" => Some(PrimitiveKind::Bool),
            "int" => Some(PrimitiveKind::Int),
            "float" | "double" => Some(PrimitiveKind::Float),
            "string" => Some(PrimitiveKind::String),
            "string-list" | "list" => Some(PrimitiveKind::StringList),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::String => "string",
            PrimitiveKind::StringList => "string-list",
        }
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Synchronous key-value store with typed primitives
///
/// Implementations serialize their own access (the reactive layer does no
/// locking of its own). Setters return whether the write was committed;
/// `false` means the store rejected or failed the write.
pub trait KeyValueStore: Send + Sync {
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_double(&self, key: &str) -> Option<f64>;
    fn get_string(&self, key: &str) -> Option<String>;
    fn get_string_list(&self, key: &str) -> Option<Vec<String>>;

    fn set_bool(&self, key: &str, value: bool) -> bool;
    fn set_int(&self, key: &str, value: i64) -> bool;
    fn set_double(&self, key: &str, value: f64) -> bool;
    fn set_string(&self, key: &str, value: &str) -> bool;
    fn set_string_list(&self, key: &str, value: &[String]) -> bool;

    /// Remove a key. Removing a key that is not present commits trivially.
    fn remove(&self, key: &str) -> bool;

    fn contains_key(&self, key: &str) -> bool;

    /// Every key currently holding a value
    fn keys(&self) -> BTreeSet<String>;

    /// Read `key` as the given kind
    fn get_primitive(&self, key: &str, kind: PrimitiveKind) -> Option<Primitive> {
        match kind {
            PrimitiveKind::Bool => self.get_bool(key).map(Primitive::Bool),
            PrimitiveKind::Int => self.get_int(key).map(Primitive::Int),
            PrimitiveKind::Float => self.get_double(key).map(Primitive::Float),
            PrimitiveKind::String => self.get_string(key).map(Primitive::String),
            PrimitiveKind::StringList => self.get_string_list(key).map(Primitive::StringList),
        }
    }

    /// Write `value` through the setter matching its kind
    fn set_primitive(&self, key: &str, value: &Primitive) -> bool {
        match value {
            Primitive::Bool(b) => self.set_bool(key, *b),
            Primitive::Int(i) => self.set_int(key, *i),
            Primitive::Float(x) => self.set_double(key, *x),
            Primitive::String(s) => self.set_string(key, s),
            Primitive::StringList(list) => self.set_string_list(key, list),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_through_str() {
        for kind in PrimitiveKind::all() {
            assert_eq!(PrimitiveKind::from_str(kind.as_str()), Some(*kind));
        }
        assert_eq!(PrimitiveKind::from_str("double"), Some(PrimitiveKind::Float));
        assert_eq!(PrimitiveKind::from_str("blob"), None);
    }

    #[test]
    fn test_primitive_untagged_yaml() {
        let values: Vec<Primitive> =
            serde_yaml::from_str("[true, 3, 2.5, hello, [a, b]]").unwrap();
        assert_eq!(
            values,
            vec![
                Primitive::Bool(true),
                Primitive::Int(3),
                Primitive::Float(2.5),
                Primitive::String("hello".to_string()),
                Primitive::StringList(vec!["a".to_string(), "b".to_string()]),
            ]
        );
    }

    #[test]
    fn test_get_primitive_dispatches_on_kind() {
        let store = MemoryStore::new();
        assert!(store.set_primitive("n", &Primitive::Int(7)));

        assert_eq!(store.get_primitive("n", PrimitiveKind::Int), Some(Primitive::Int(7)));
        assert_eq!(store.get_primitive("n", PrimitiveKind::String), None);
        assert_eq!(store.get_primitive("missing", PrimitiveKind::Int), None);
    }
}
