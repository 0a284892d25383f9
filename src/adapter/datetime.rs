//! Date/time adapter - instants stored as epoch milliseconds in a string
//!
//! Precision is coarsened to whole milliseconds: sub-millisecond parts of an
//! instant are dropped on encode. Stored text that is not a valid
//! millisecond count (or lies outside chrono's range) reads as absent.

use super::ValueAdapter;
use crate::store::{Primitive, PrimitiveKind};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Stores `DateTime<Utc>` as the decimal count of milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeAdapter;

impl ValueAdapter<DateTime<Utc>> for DateTimeAdapter {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::String
    }

    fn decode(&self, raw: Primitive) -> Option<DateTime<Utc>> {
        let Primitive::String(text) = raw else {
            return None;
        };

        match text.trim().parse::<i64>() {
            Ok(millis) => {
                let decoded = DateTime::from_timestamp_millis(millis);
                if decoded.is_none() {
                    debug!("Stored timestamp out of range, treating as absent: {}", millis);
                }
                decoded
            }
            Err(e) => {
                debug!("Unparsable stored timestamp {:?}, treating as absent: {}", text, e);
                None
            }
        }
    }

    fn encode(&self, value: &DateTime<Utc>) -> Option<Primitive> {
        Some(Primitive::String(value.timestamp_millis().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    proptest! {
        /// Round trip loses at most the sub-millisecond part
        #[test]
        fn prop_round_trip_within_one_millisecond(
            secs in -8_000_000_000i64..8_000_000_000i64,
            nanos in 0u32..1_000_000_000u32,
        ) {
            let instant = Utc.timestamp_opt(secs, nanos).unwrap();
            let raw = DateTimeAdapter.encode(&instant).unwrap();
            let back = DateTimeAdapter.decode(raw).unwrap();

            let error = instant - back;
            prop_assert!(error >= Duration::zero());
            prop_assert!(error < Duration::milliseconds(1));
        }
    }

    #[test]
    fn test_encodes_millis_as_string() {
        let instant = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            DateTimeAdapter.encode(&instant),
            Some(Primitive::String("1700000000123".to_string()))
        );
    }

    #[test]
    fn test_pre_epoch_instant() {
        let instant = Utc.timestamp_millis_opt(-86_400_000).unwrap();
        let raw = DateTimeAdapter.encode(&instant).unwrap();
        assert_eq!(DateTimeAdapter.decode(raw), Some(instant));
    }

    #[test]
    fn test_corrupted_text_reads_absent() {
        let store = MemoryStore::new();
        store.set_string("last_seen", "yesterday-ish");
        assert_eq!(DateTimeAdapter.read(&store, "last_seen"), None);

        store.set_string("last_seen", "");
        assert_eq!(DateTimeAdapter.read(&store, "last_seen"), None);

        store.set_string("last_seen", &i64::MAX.to_string());
        assert_eq!(DateTimeAdapter.read(&store, "last_seen"), None);
    }

    #[test]
    fn test_missing_and_wrong_kind_read_absent() {
        let store = MemoryStore::new();
        assert_eq!(DateTimeAdapter.read(&store, "last_seen"), None);

        store.set_int("last_seen", 1_700_000_000_000);
        assert_eq!(DateTimeAdapter.read(&store, "last_seen"), None);
    }
}
