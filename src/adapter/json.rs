//! JSON adapter - arbitrary serde types stored as a JSON string

use super::ValueAdapter;
use crate::store::{Primitive, PrimitiveKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Stores any `Serialize + DeserializeOwned` value as a JSON document
///
/// Malformed JSON, or JSON of the wrong shape, reads as absent.
pub struct JsonAdapter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonAdapter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonAdapter<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonAdapter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonAdapter")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> ValueAdapter<T> for JsonAdapter<T>
where
    T: Serialize + DeserializeOwned,
{
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::String
    }

    fn decode(&self, raw: Primitive) -> Option<T> {
        let Primitive::String(text) = raw else {
            return None;
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Stored JSON unreadable, treating as absent: {}", e);
                None
            }
        }
    }

    fn encode(&self, value: &T) -> Option<Primitive> {
        match serde_json::to_string(value) {
            Ok(text) => Some(Primitive::String(text)),
            Err(e) => {
                warn!("Value has no JSON representation, not writing it: {}", e);
                None
            }
        }
    }
}
