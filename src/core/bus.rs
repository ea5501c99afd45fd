//! # ChannelEventBus: the public facade over the registry.
//!
//! [`ChannelEventBus`] routes each event to the queue of its key, hands out
//! single-consumer subscriptions, and closes keys. All state changes go
//! through the [`Registry`]; the facade adds the error taxonomy, logger
//! notifications and the subscription lifecycle.
//!
//! ## Architecture
//! ```text
//! Producers (many, any thread):          Consumer (one per key):
//!   send(event) ──┐
//!   send(event) ──┼──► Registry ──► [queue K] ──► Subscription<K> / EventStream<K>
//!   send(event) ──┘     (mutex)  └─► [queue L] ──► (idle: events retained)
//!                           │
//!   close_key(K) ───────────┤ validate + remove ──► queue closed
//!   close()      ───────────┘ remove all
//!                           │
//!                           └──► BusLogger (after the lock is released)
//! ```
//!
//! ## Rules
//! - **Non-blocking send**: enqueue on an unbounded queue, never waits.
//! - **Retention**: events sent before any consumer attaches stay queued until
//!   one does (or the key is closed).
//! - **Single consumer**: a second attach fails with [`FlowAlreadyCollected`].
//! - **Logger isolation**: logger callbacks run outside the registry lock and a
//!   panicking logger is caught and reported.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, trace};

use super::builder::ChannelEventBusBuilder;
use super::registry::{EntrySnapshot, Registry, Release};
use super::subscription::{EventStream, Subscription};
use crate::config::{CloseOptions, Config};
use crate::error::{CloseError, FlowAlreadyCollected, SendCause, SendError};
use crate::events::{ChannelEvent, EventKey, KeyId};
use crate::loggers::BusLogger;

struct Inner {
    cfg: Config,
    registry: Registry,
    logger: Arc<dyn BusLogger>,
}

/// Keyed event bus: one unbounded FIFO queue per key, many producers, at most
/// one consumer per key.
///
/// Cheap to clone; clones share the same registry.
///
/// ## Example
/// ```rust
/// use futures::StreamExt;
/// use keybus::{ChannelEvent, ChannelEventBus, EventKey};
///
/// #[derive(Debug, PartialEq)]
/// struct Toast(&'static str);
///
/// impl ChannelEvent for Toast {
///     fn key(&self) -> EventKey<Self> {
///         EventKey::new("toast")
///     }
/// }
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let bus = ChannelEventBus::new();
///     bus.send(Toast("saved"))?;
///     bus.send(Toast("synced"))?;
///
///     let mut sub = bus.subscribe(EventKey::<Toast>::new("toast"))?;
///     assert_eq!(sub.next().await, Some(Toast("saved")));
///     assert_eq!(sub.next().await, Some(Toast("synced")));
///
///     drop(sub);
///     bus.close_key(EventKey::<Toast>::new("toast"))?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ChannelEventBus {
    inner: Arc<Inner>,
}

impl ChannelEventBus {
    /// Creates a bus with the default config and no-op logger.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns a builder for a customised bus.
    #[must_use]
    pub fn builder() -> ChannelEventBusBuilder {
        ChannelEventBusBuilder::new()
    }

    pub(crate) fn from_parts(cfg: Config, logger: Arc<dyn BusLogger>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cfg,
                registry: Registry::new(),
                logger,
            }),
        }
    }

    /// Returns the bus configuration.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Enqueues `event` on the queue of its key, creating the entry if needed.
    ///
    /// Never blocks. Fails only if the entry was closed concurrently and its
    /// queue no longer accepts events; the event is returned in the error.
    pub fn send<E: ChannelEvent>(&self, event: E) -> Result<(), SendError<E>> {
        let key = event.key();
        let id = key.id();

        let handle = self.inner.registry.get_or_create(key);
        if handle.created {
            self.notify(|l, bus| l.on_created(&id, bus));
        }

        match handle.enqueue(event) {
            Ok(()) => {
                trace!(key = %id, "event sent");
                Ok(())
            }
            Err(event) => Err(SendError {
                event,
                key: id,
                cause: SendCause::QueueClosed,
            }),
        }
    }

    /// Returns a lazy stream over `key`.
    ///
    /// The key is claimed on the first poll, not here; see [`EventStream`].
    pub fn receive_as_stream<E: ChannelEvent>(&self, key: EventKey<E>) -> EventStream<E> {
        EventStream::new(self.clone(), key)
    }

    /// Claims `key` for collection right away.
    ///
    /// Fails with [`FlowAlreadyCollected`] if another subscription is attached.
    /// The claim is released when the returned [`Subscription`] is dropped.
    pub fn subscribe<E: ChannelEvent>(
        &self,
        key: EventKey<E>,
    ) -> Result<Subscription<E>, FlowAlreadyCollected> {
        let id = key.id();
        let attached = self.inner.registry.get_or_create_and_mark_collecting(key)?;
        if attached.created {
            self.notify(|l, bus| l.on_created(&id, bus));
        }
        self.notify(|l, bus| l.on_start_collection(&id, bus));
        Ok(Subscription::new(self.clone(), id, attached))
    }

    /// Returns a subscription's receiver to the registry.
    pub(crate) fn release<E: ChannelEvent>(
        &self,
        key: KeyId,
        generation: u64,
        rx: mpsc::UnboundedReceiver<E>,
    ) {
        match self.inner.registry.mark_not_collecting(key, generation, rx) {
            Release::Stopped => self.notify(|l, bus| l.on_stop_collection(&key, bus)),
            Release::Detached(rx) => drop(rx),
        }
    }

    /// Closes `key` using the configured [`CloseOptions`].
    pub fn close_key(&self, key: impl Into<KeyId>) -> Result<(), CloseError> {
        self.close_key_with(key, self.inner.cfg.close_options)
    }

    /// Closes `key` after validating it against `options`.
    ///
    /// On success the entry is removed and its queue closed: an attached
    /// consumer receives what was already enqueued and then ends. On failure
    /// the entry is left untouched.
    pub fn close_key_with(
        &self,
        key: impl Into<KeyId>,
        options: CloseOptions,
    ) -> Result<(), CloseError> {
        let key = key.into();
        if let Some(entry) = self.inner.registry.remove(key, options)? {
            entry.close();
            self.notify(|l, bus| l.on_closed(&key, bus));
        }
        Ok(())
    }

    /// Closes every key without validation.
    pub fn close(&self) {
        let removed = self.inner.registry.remove_all();
        let mut keys = Vec::with_capacity(removed.len());
        for (key, entry) in removed {
            entry.close();
            keys.push(key);
        }
        self.notify(|l, bus| l.on_closed_all(&keys, bus));
    }

    /// True if an entry exists for `key`.
    pub fn contains_key(&self, key: impl Into<KeyId>) -> bool {
        self.inner.registry.contains(key.into())
    }

    /// True if a subscription is attached to `key`.
    pub fn is_collecting(&self, key: impl Into<KeyId>) -> bool {
        self.inner.registry.is_collecting(key.into())
    }

    /// Number of events sent to `key` and not yet received.
    pub fn pending(&self, key: impl Into<KeyId>) -> usize {
        self.inner.registry.pending(key.into())
    }

    /// Number of open keys.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    /// True if no key is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the state of every open key, sorted by key name.
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        self.inner.registry.snapshot()
    }

    /// Runs a logger callback; a panic inside it is caught and reported.
    fn notify(&self, f: impl FnOnce(&dyn BusLogger, &ChannelEventBus)) {
        let logger = self.inner.logger.as_ref();
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| f(logger, self))) {
            error!(
                logger = logger.name(),
                info = panic_message(panic.as_ref()),
                "bus logger panicked"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

impl Default for ChannelEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelEventBus")
            .field("entries", &self.snapshot())
            .field("logger", &self.inner.logger.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures::StreamExt;

    #[derive(Debug, PartialEq)]
    struct Num(u32);

    const NUM: EventKey<Num> = EventKey::new("num");

    impl ChannelEvent for Num {
        fn key(&self) -> EventKey<Self> {
            NUM
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, what: &str, key: &KeyId) {
            self.calls.lock().unwrap().push(format!("{what}:{key}"));
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    impl BusLogger for Recorder {
        fn on_created(&self, key: &KeyId, _bus: &ChannelEventBus) {
            self.push("created", key);
        }
        fn on_start_collection(&self, key: &KeyId, _bus: &ChannelEventBus) {
            self.push("start", key);
        }
        fn on_stop_collection(&self, key: &KeyId, _bus: &ChannelEventBus) {
            self.push("stop", key);
        }
        fn on_closed(&self, key: &KeyId, _bus: &ChannelEventBus) {
            self.push("closed", key);
        }
        fn on_closed_all(&self, keys: &[KeyId], _bus: &ChannelEventBus) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("closed_all:{}", keys.len()));
        }
    }

    struct Panicky;

    impl BusLogger for Panicky {
        fn on_created(&self, _key: &KeyId, _bus: &ChannelEventBus) {
            panic!("logger blew up");
        }
        fn on_start_collection(&self, _key: &KeyId, bus: &ChannelEventBus) {
            // Formatting the bus re-enters the registry lock.
            let _ = format!("{bus:?}");
            panic!("logger blew up again");
        }
    }

    #[tokio::test]
    async fn events_sent_before_subscribe_are_retained() {
        let bus = ChannelEventBus::new();
        bus.send(Num(1)).unwrap();
        bus.send(Num(2)).unwrap();
        assert_eq!(bus.pending(NUM), 2);

        let mut sub = bus.subscribe(NUM).unwrap();
        assert_eq!(sub.recv().await, Some(Num(1)));
        assert_eq!(sub.try_recv(), Some(Num(2)));
        assert_eq!(sub.try_recv(), None);
        assert_eq!(bus.pending(NUM), 0);
    }

    #[tokio::test]
    async fn drop_releases_claim() {
        let bus = ChannelEventBus::new();
        let sub = bus.subscribe(NUM).unwrap();
        assert!(bus.is_collecting(NUM));
        assert_eq!(bus.subscribe(NUM).unwrap_err().key, NUM.id());

        drop(sub);
        assert!(!bus.is_collecting(NUM));
        assert!(bus.subscribe(NUM).is_ok());
    }

    #[tokio::test]
    async fn lazy_stream_claims_on_first_poll() {
        let bus = ChannelEventBus::new();
        let mut stream = bus.receive_as_stream(NUM);
        assert!(!bus.contains_key(NUM));
        assert!(!stream.is_attached());

        bus.send(Num(5)).unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Num(5));
        assert!(stream.is_attached());
        assert!(bus.is_collecting(NUM));

        let mut second = bus.receive_as_stream(NUM);
        assert_eq!(second.next().await.unwrap().unwrap_err().key, NUM.id());
        assert!(second.next().await.is_none());

        drop(stream);
        assert!(!bus.is_collecting(NUM));
    }

    #[tokio::test]
    async fn close_key_ends_attached_stream_after_drain() {
        let bus = ChannelEventBus::new();
        let mut stream = bus.receive_as_stream(NUM);
        bus.send(Num(1)).unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Num(1));

        bus.send(Num(2)).unwrap();
        bus.close_key_with(NUM, CloseOptions::none()).unwrap();
        assert!(!bus.contains_key(NUM));

        assert_eq!(stream.next().await.unwrap().unwrap(), Num(2));
        assert!(stream.next().await.is_none());
        assert!(futures::stream::FusedStream::is_terminated(&stream));
    }

    #[tokio::test]
    async fn logger_sees_lifecycle_in_order() {
        let rec = Arc::new(Recorder::default());
        let bus = ChannelEventBus::builder().with_logger(rec.clone()).build();

        bus.send(Num(1)).unwrap();
        bus.send(Num(2)).unwrap();
        let sub = bus.subscribe(NUM).unwrap();
        drop(sub);
        bus.close_key(NUM).unwrap();
        bus.send(Num(3)).unwrap();
        bus.close();

        assert_eq!(
            rec.take(),
            vec![
                "created:num",
                "start:num",
                "stop:num",
                "closed:num",
                "created:num",
                "closed_all:1",
            ]
        );
    }

    #[tokio::test]
    async fn failed_close_does_not_notify() {
        let rec = Arc::new(Recorder::default());
        let bus = ChannelEventBus::builder().with_logger(rec.clone()).build();

        assert_eq!(
            bus.close_key(NUM),
            Err(CloseError::BusDoesNotExist { key: NUM.id() })
        );
        bus.close_key_with(NUM, CloseOptions::none()).unwrap();
        assert!(rec.take().is_empty());
    }

    #[tokio::test]
    async fn panicking_logger_is_isolated() {
        let bus = ChannelEventBus::builder()
            .with_logger(Arc::new(Panicky))
            .build();

        bus.send(Num(1)).unwrap();
        let mut sub = bus.subscribe(NUM).unwrap();
        assert_eq!(sub.recv().await, Some(Num(1)));
        assert!(bus.is_collecting(NUM));

        drop(sub);
        bus.close_key(NUM).unwrap();
        assert!(bus.is_empty());
    }

    #[test]
    fn debug_lists_entries() {
        let bus = ChannelEventBus::new();
        bus.send(Num(1)).unwrap();
        let dbg = format!("{bus:?}");
        assert!(dbg.contains("pending: 1"), "{dbg}");
        assert!(dbg.contains("is_collecting: false"), "{dbg}");
    }
}
