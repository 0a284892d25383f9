//! Live Prefs - reactive preferences over a flat key-value store
//!
//! Wraps a synchronous key-value store so that every read can also be
//! observed: a [`Preference`] returns its current value synchronously and
//! emits a new value whenever its key is written, from any code path that
//! publishes through the shared [`ChangeNotifier`].
//!
//! ```
//! use std::sync::Arc;
//! use live_prefs::{combine_latest, MemoryStore, Observable, PreferenceFactory};
//!
//! let factory = PreferenceFactory::with_store(Arc::new(MemoryStore::new()));
//! let volume = factory.get_int("volume", 50).unwrap();
//! let muted = factory.get_bool("muted", false).unwrap();
//!
//! let mut levels = combine_latest((&volume, &muted))
//!     .map(|(volume, muted)| if muted { 0 } else { volume })
//!     .stream();
//!
//! volume.set(80);
//! muted.set(true);
//!
//! assert_eq!(levels.drain(), vec![50, 80, 0]);
//! ```

pub mod adapter;
pub mod combinators;
pub mod config;
pub mod error;
pub mod factory;
pub mod notifier;
pub mod observable;
pub mod preference;
pub mod store;

pub use adapter::{
    BoolAdapter, DateTimeAdapter, FloatAdapter, IntAdapter, JsonAdapter, StringAdapter,
    StringListAdapter, ValueAdapter,
};
pub use combinators::{combine_latest, map, Combined, Map};
pub use error::{PrefsError, Result};
pub use factory::{KeySet, PreferenceFactory};
pub use notifier::{ChangeNotifier, ListenerId, Subscription};
pub use observable::{Listener, LiveStream, Observable};
pub use preference::Preference;
pub use store::{KeyValueStore, MemoryStore, Primitive, PrimitiveKind};
