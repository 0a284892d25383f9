//! Combinators - derived observables built from existing ones
//!
//! Derived values own no key and cannot be written. They hold only what
//! they need to recompute an emission, and their subscription owns the
//! upstream subscriptions, so dropping it releases every upstream.
//!
//! `combine_latest` does no batching. Two writes made one after the other
//! produce two emissions, the first of which pairs the new value of one
//! upstream with the old value of the other.

use crate::notifier::Subscription;
use crate::observable::{Listener, Observable};
use parking_lot::Mutex;
use std::sync::Arc;

/// Observable transforming each emission of `S` through `F`
///
/// `F` must be pure; writing to a store from inside it is not supported.
pub struct Map<S, F> {
    source: S,
    f: Arc<F>,
}

impl<S, F> Map<S, F> {
    pub fn new(source: S, f: F) -> Self {
        Self {
            source,
            f: Arc::new(f),
        }
    }
}

impl<S: Clone, F> Clone for Map<S, F> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

impl<S, F, R> Observable for Map<S, F>
where
    S: Observable,
    F: Fn(S::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    type Item = R;

    fn observe_with(&self, listener: Listener<R>) -> Subscription {
        let f = Arc::clone(&self.f);
        self.source
            .observe_with(Arc::new(move |value: S::Item| listener(f(value))))
    }
}

/// Free-function form of [`Observable::map`]
pub fn map<S, F, R>(source: S, f: F) -> Map<S, F>
where
    S: Observable,
    F: Fn(S::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    Map::new(source, f)
}

/// Observable joining a tuple of observables into a tuple of their latest values
///
/// Implemented for tuples of 2 to 6 sources.
#[derive(Clone)]
pub struct Combined<S> {
    sources: S,
}

/// Join `sources` (a tuple of observables) into one observable of tuples
///
/// The first tuple is emitted once every source has emitted, which happens
/// during subscription since each source emits its current value
/// synchronously. After that, every emission of any source re-emits the
/// whole tuple with the latest value of each slot.
pub fn combine_latest<S>(sources: S) -> Combined<S> {
    Combined { sources }
}

macro_rules! impl_combined {
    ($(($src:ident, $slot:ident, $idx:tt)),+) => {
        impl<$($src),+> Observable for Combined<($($src,)+)>
        where
            $($src: Observable, $src::Item: Clone,)+
        {
            type Item = ($($src::Item,)+);

            fn observe_with(&self, listener: Listener<Self::Item>) -> Subscription {
                let slots: Arc<Mutex<($(Option<$src::Item>,)+)>> =
                    Arc::new(Mutex::new(Default::default()));

                let complete = |slots: &($(Option<$src::Item>,)+)| -> Option<Self::Item> {
                    match slots {
                        ($(Some($slot),)+) => Some(($($slot.clone(),)+)),
                        _ => None,
                    }
                };

                let upstream = vec![$({
                    let slots = Arc::clone(&slots);
                    let listener = Arc::clone(&listener);
                    self.sources.$idx.observe_with(Arc::new(move |value: $src::Item| {
                        let latest = {
                            let mut guard = slots.lock();
                            guard.$idx = Some(value);
                            complete(&*guard)
                        };
                        if let Some(tuple) = latest {
                            listener(tuple);
                        }
                    }))
                }),+];

                Subscription::merge(upstream)
            }
        }
    };
}

impl_combined!((A, a, 0), (B, b, 1));
impl_combined!((A, a, 0), (B, b, 1), (C, c, 2));
impl_combined!((A, a, 0), (B, b, 1), (C, c, 2), (D, d, 3));
impl_combined!((A, a, 0), (B, b, 1), (C, c, 2), (D, d, 3), (E, e, 4));
impl_combined!((A, a, 0), (B, b, 1), (C, c, 2), (D, d, 3), (E, e, 4), (G, g, 5));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{BoolAdapter, IntAdapter, StringAdapter};
    use crate::notifier::ChangeNotifier;
    use crate::preference::Preference;
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: ChangeNotifier,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryStore::new()),
                notifier: ChangeNotifier::new(),
            }
        }

        fn int(&self, key: &str, default: i64) -> Preference<i64> {
            Preference::new(key, default, Arc::new(IntAdapter), self.store.clone(), self.notifier.clone())
                .unwrap()
        }

        fn string(&self, key: &str, default: &str) -> Preference<String> {
            Preference::new(
                key,
                default.to_string(),
                Arc::new(StringAdapter),
                self.store.clone(),
                self.notifier.clone(),
            )
            .unwrap()
        }
    }

    #[test]
    fn test_map_doubles_every_emission() {
        let fx = Fixture::new();
        let count = fx.int("count", 0);
        let mut doubled = count.clone().map(|n| n * 2).stream();

        count.set(1);
        count.set(2);
        count.set(3);

        assert_eq!(doubled.drain(), vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_map_free_function_and_chaining() {
        let fx = Fixture::new();
        let count = fx.int("count", 4);
        let label = map(&count, |n| n + 1).map(|n| format!("#{}", n));

        assert_eq!(label.current(), Some("#5".to_string()));
        count.set(9);
        assert_eq!(label.current(), Some("#10".to_string()));
    }

    #[test]
    fn test_combine_latest_pair() {
        let fx = Fixture::new();
        let a = fx.int("a", 1);
        let b = fx.string("b", "x");
        let mut pairs = combine_latest((&a, &b)).stream();

        assert_eq!(pairs.drain(), vec![(1, "x".to_string())]);

        a.set(2);
        assert_eq!(pairs.drain(), vec![(2, "x".to_string())]);

        b.set("y".to_string());
        assert_eq!(pairs.drain(), vec![(2, "y".to_string())]);
    }

    #[test]
    fn test_sequential_writes_emit_intermediate_tuple() {
        let fx = Fixture::new();
        let a = fx.int("a", 0);
        let b = fx.int("b", 0);
        let mut sums = combine_latest((a.clone(), b.clone())).stream();
        sums.drain();

        a.set(1);
        b.set(1);

        assert_eq!(sums.drain(), vec![(1, 0), (1, 1)]);
    }

    #[test]
    fn test_combine_latest_same_key_twice() {
        let fx = Fixture::new();
        let first = fx.int("shared", 0);
        let second = fx.int("shared", 0);
        let mut pairs = combine_latest((&first, &second)).stream();
        pairs.drain();

        first.set(5);

        // One publish, two upstream emissions
        assert_eq!(pairs.drain(), vec![(5, 0), (5, 5)]);
    }

    #[test]
    fn test_combine_latest_wider_tuple() {
        let fx = Fixture::new();
        let flag = Preference::new(
            "flag",
            false,
            Arc::new(BoolAdapter),
            fx.store.clone(),
            fx.notifier.clone(),
        )
        .unwrap();
        let count = fx.int("count", 3);
        let name = fx.string("name", "n");

        let combined = combine_latest((&flag, &count, &name));
        assert_eq!(combined.current(), Some((false, 3, "n".to_string())));

        flag.set(true);
        assert_eq!(combined.current(), Some((true, 3, "n".to_string())));
    }

    #[test]
    fn test_combine_then_map() {
        let fx = Fixture::new();
        let width = fx.int("width", 2);
        let height = fx.int("height", 3);
        let mut area = combine_latest((&width, &height))
            .map(|(w, h)| w * h)
            .stream();

        width.set(4);
        assert_eq!(area.drain(), vec![6, 12]);
    }

    #[test]
    fn test_dropping_combined_stream_releases_upstreams() {
        let fx = Fixture::new();
        let a = fx.int("a", 0);
        let b = fx.int("b", 0);

        let pairs = combine_latest((&a, &b)).stream();
        let _other = a.stream();
        assert_eq!(fx.notifier.listener_count("a"), 2);
        assert_eq!(fx.notifier.listener_count("b"), 1);

        drop(pairs);
        assert_eq!(fx.notifier.listener_count("a"), 1);
        assert_eq!(fx.notifier.listener_count("b"), 0);

        let mut doubled = map(&a, |n| n * 2).stream();
        doubled.drain();
        drop(doubled);
        assert_eq!(fx.notifier.listener_count("a"), 1);
    }
}
