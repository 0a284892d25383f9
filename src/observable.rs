//! Observable values and their live streams
//!
//! Anything that can report a current value and every later change
//! implements [`Observable`]: preferences, the live key set, and the
//! derived values built by the combinators. `observe` drives a callback,
//! `stream` hands out an async [`LiveStream`], and `current` reads the value
//! synchronously.
//!
//! Contract for `observe_with`: the listener is called once, synchronously,
//! with the current value before `observe_with` returns, then once per
//! upstream change, until the returned [`Subscription`] is dropped.

use crate::combinators::Map;
use crate::notifier::Subscription;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// Shared callback receiving emitted values
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A value that emits its current state and every later change
pub trait Observable {
    type Item: Send + 'static;

    /// Register `listener`; see the module docs for the emission contract
    fn observe_with(&self, listener: Listener<Self::Item>) -> Subscription;

    /// Closure form of [`Observable::observe_with`]
    fn observe<F>(&self, listener: F) -> Subscription
    where
        Self: Sized,
        F: Fn(Self::Item) + Send + Sync + 'static,
    {
        self.observe_with(Arc::new(listener))
    }

    /// Live stream starting with the current value
    fn stream(&self) -> LiveStream<Self::Item>
    where
        Self: Sized,
    {
        LiveStream::attach(|listener| self.observe_with(listener))
    }

    /// Current value, read synchronously
    ///
    /// Subscribes, keeps the initial emission and unsubscribes again.
    fn current(&self) -> Option<Self::Item>
    where
        Self: Sized,
    {
        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        let subscription = self.observe_with(Arc::new(move |value: Self::Item| {
            let mut first = sink.lock();
            if first.is_none() {
                *first = Some(value);
            }
        }));
        drop(subscription);
        let value = slot.lock().take();
        value
    }

    /// Transform every emission through `f`
    fn map<R, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Item) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        Map::new(self, f)
    }
}

impl<O> Observable for &O
where
    O: Observable,
{
    type Item = O::Item;

    fn observe_with(&self, listener: Listener<Self::Item>) -> Subscription {
        (**self).observe_with(listener)
    }
}

/// Async stream of emitted values
///
/// Values are queued synchronously as they are emitted, so nothing is lost
/// between polls. The queue is unbounded: a stream that is held but never
/// polled keeps one entry per emission until it is read or dropped. Use
/// [`LiveStream::latest`] to catch up, or drop streams that are no longer
/// read. The stream owns its subscription: dropping it (or calling
/// [`LiveStream::unsubscribe`]) stops delivery without affecting other
/// subscribers of the same source. The stream never ends on its own.
pub struct LiveStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
    subscription: Subscription,
}

impl<T: Send + 'static> LiveStream<T> {
    /// Build a stream from a subscribe function that accepts a listener
    pub fn attach<F>(subscribe: F) -> Self
    where
        F: FnOnce(Listener<T>) -> Subscription,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener: Listener<T> = Arc::new(move |value: T| {
            // Receiver gone means the stream is being dropped
            let _ = tx.send(value);
        });
        let subscription = subscribe(listener);
        Self { rx, subscription }
    }
}

impl<T> LiveStream<T> {
    /// Next queued value without waiting
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Every queued value, oldest first
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Ok(value) = self.rx.try_recv() {
            values.push(value);
        }
        values
    }

    /// Most recent queued value, discarding older ones
    pub fn latest(&mut self) -> Option<T> {
        self.drain().pop()
    }

    /// Stop delivery now
    pub fn unsubscribe(self) {}

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<T> Stream for LiveStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> std::fmt::Debug for LiveStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveStream")
            .field("subscription", &self.subscription)
            .finish()
    }
}
