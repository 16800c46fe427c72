//! Per-key shared streams with replay of the latest value.
//!
//! [`Multiplexer::stream_for`] guarantees at most one running engine per
//! key. The registry holds only weak handles: a [`SharedStream`] and every
//! [`Subscription`] derived from it keep the engine alive, and dropping the
//! last of them aborts the engine task. Dead registry entries are evicted
//! whenever a new stream is created.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::{Latest, PollEngine, RateSource, RetryPolicy};

/// Shared state behind a stream; aborts the engine when dropped.
struct StreamInner<T> {
    label: String,
    rx: watch::Receiver<Latest<T>>,
    task: JoinHandle<()>,
}

impl<T> Drop for StreamInner<T> {
    fn drop(&mut self) {
        debug!(key = %self.label, "Last holder gone, stopping engine");
        self.task.abort();
    }
}

/// Handle to one key's engine output. Cloning shares the same engine.
pub struct SharedStream<T> {
    inner: Arc<StreamInner<T>>,
}

impl<T> Clone for SharedStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedStream<T> {
    /// Starts observing; the latest value (if any) is delivered first.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.inner.rx.clone(),
            _stream: Some(Arc::clone(&self.inner)),
        }
    }

    /// The most recently published value, without waiting.
    #[must_use]
    pub fn latest(&self) -> Latest<T> {
        self.inner.rx.borrow().clone()
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// `true` if both handles share one engine.
    #[must_use]
    pub fn same_stream(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// One observer of a stream.
pub struct Subscription<T> {
    rx: watch::Receiver<Latest<T>>,
    _stream: Option<Arc<StreamInner<T>>>,
}

impl<T> Subscription<T> {
    /// Wraps a bare receiver, e.g. the output of a routing task.
    pub(crate) fn from_receiver(rx: watch::Receiver<Latest<T>>) -> Self {
        Self { rx, _stream: None }
    }

    /// Waits for a value this subscription has not yet seen.
    ///
    /// Returns `None` once the publisher is gone for good.
    pub async fn next(&mut self) -> Option<Arc<T>> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(value) = self.rx.borrow_and_update().clone() {
                return Some(value);
            }
        }
    }

    /// The most recently published value, without waiting or marking it seen.
    #[must_use]
    pub fn latest(&self) -> Latest<T> {
        self.rx.borrow().clone()
    }
}

/// Registry of running engines, one per key.
pub struct Multiplexer<K, S: RateSource> {
    streams: Mutex<HashMap<K, Weak<StreamInner<S::Output>>>>,
    factory: Box<dyn Fn(&K) -> S + Send + Sync>,
    retry: RetryPolicy,
}

impl<K, S> Multiplexer<K, S>
where
    K: Eq + Hash + Clone,
    S: RateSource,
{
    /// Creates a multiplexer that builds a source for each new key.
    #[must_use]
    pub fn new<F>(retry: RetryPolicy, factory: F) -> Self
    where
        F: Fn(&K) -> S + Send + Sync + 'static,
    {
        Self {
            streams: Mutex::new(HashMap::new()),
            factory: Box::new(factory),
            retry,
        }
    }

    /// Returns the key's shared stream, starting its engine if none is live.
    ///
    /// Must be called from within a tokio runtime.
    pub fn stream_for(&self, key: &K) -> SharedStream<S::Output> {
        let mut streams = self.streams.lock();
        if let Some(inner) = streams.get(key).and_then(Weak::upgrade) {
            return SharedStream { inner };
        }

        streams.retain(|_, weak| weak.strong_count() > 0);

        let source = (self.factory)(key);
        let label = source.label();
        let (tx, rx) = watch::channel(None);
        let engine = PollEngine::new(source, self.retry, tx);
        let task = tokio::spawn(engine.run());
        info!(key = %label, "Started engine");

        let inner = Arc::new(StreamInner { label, rx, task });
        streams.insert(key.clone(), Arc::downgrade(&inner));
        SharedStream { inner }
    }

    /// Number of keys whose engine is currently alive.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.streams
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
