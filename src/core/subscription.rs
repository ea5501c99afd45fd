//! # Consumer side: subscriptions and lazy event streams.
//!
//! A [`Subscription`] is the scoped "collecting" claim on one key. It is
//! acquired by [`ChannelEventBus::subscribe`] and released by `Drop`, so the
//! claim is returned on every exit path:
//!
//! ```text
//! subscribe(key) ──► Registry: Idle → Collecting (receiver checked out)
//!      │
//!      ├─► recv() / poll_next() ... FIFO events ...
//!      │
//!      └─► drop(Subscription)          ◄── stream exhausted
//!            │                         ◄── consumer task cancelled / aborted
//!            │                         ◄── panic unwinding through the consumer
//!            └─► Registry: Collecting → Idle (receiver checked back in)
//! ```
//!
//! [`EventStream`] is the lazy flavour returned by
//! [`ChannelEventBus::receive_as_stream`]: nothing is claimed until the first
//! poll, and the claim is dropped as soon as the stream ends.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream};
use tokio::sync::mpsc;

use super::bus::ChannelEventBus;
use super::registry::Attached;
use crate::error::FlowAlreadyCollected;
use crate::events::{ChannelEvent, EventKey, KeyId};

/// Exclusive consumer of one key's queue.
///
/// Yields events in send order. Ends (`None`) once the key is closed and every
/// event enqueued before the close has been received.
pub struct Subscription<E: ChannelEvent> {
    bus: ChannelEventBus,
    key: KeyId,
    generation: u64,
    pending: Arc<AtomicUsize>,
    /// Taken in `Drop` and handed back to the registry.
    rx: Option<mpsc::UnboundedReceiver<E>>,
}

impl<E: ChannelEvent> Subscription<E> {
    pub(crate) fn new(bus: ChannelEventBus, key: KeyId, attached: Attached<E>) -> Self {
        Self {
            bus,
            key,
            generation: attached.generation,
            pending: attached.pending,
            rx: Some(attached.rx),
        }
    }

    /// Returns the key this subscription drains.
    pub fn key(&self) -> KeyId {
        self.key
    }

    /// Receives the next event, waiting while the queue is empty.
    ///
    /// Returns `None` once the key has been closed and drained.
    /// Cancel-safe: dropping the future never loses an event.
    pub async fn recv(&mut self) -> Option<E> {
        let rx = self.rx.as_mut()?;
        let event = rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// Receives the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<E> {
        let event = self.rx.as_mut()?.try_recv().ok()?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }
}

impl<E: ChannelEvent> Stream for Subscription<E> {
    type Item = E;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        let this = self.get_mut();
        let Some(rx) = this.rx.as_mut() else {
            return Poll::Ready(None);
        };
        match rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                this.pending.fetch_sub(1, Ordering::AcqRel);
                Poll::Ready(Some(event))
            }
            other => other,
        }
    }
}

// No field is structurally pinned.
impl<E: ChannelEvent> Unpin for Subscription<E> {}

impl<E: ChannelEvent> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(rx) = self.rx.take() {
            self.bus.release(self.key, self.generation, rx);
        }
    }
}

impl<E: ChannelEvent> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

enum StreamState<E: ChannelEvent> {
    Idle {
        bus: ChannelEventBus,
        key: EventKey<E>,
    },
    Attached(Subscription<E>),
    Done,
}

/// Lazy stream over one key.
///
/// - First poll attaches; if another consumer holds the key it yields a
///   single `Err(FlowAlreadyCollected)` and ends.
/// - Then yields `Ok(event)` in FIFO order, pending while the queue is empty.
/// - Ends when the key is closed and drained; the claim is released right
///   away, or on drop if the stream is abandoned early.
///
/// A finished stream stays finished; call `receive_as_stream` again to
/// collect the key anew.
pub struct EventStream<E: ChannelEvent> {
    state: StreamState<E>,
}

impl<E: ChannelEvent> EventStream<E> {
    pub(crate) fn new(bus: ChannelEventBus, key: EventKey<E>) -> Self {
        Self {
            state: StreamState::Idle { bus, key },
        }
    }

    /// True while the stream holds the key's collecting claim.
    pub fn is_attached(&self) -> bool {
        matches!(self.state, StreamState::Attached(_))
    }
}

impl<E: ChannelEvent> Stream for EventStream<E> {
    type Item = Result<E, FlowAlreadyCollected>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if matches!(this.state, StreamState::Idle { .. }) {
            if let StreamState::Idle { bus, key } =
                std::mem::replace(&mut this.state, StreamState::Done)
            {
                match bus.subscribe(key) {
                    Ok(sub) => this.state = StreamState::Attached(sub),
                    Err(err) => return Poll::Ready(Some(Err(err))),
                }
            }
        }

        let StreamState::Attached(sub) = &mut this.state else {
            return Poll::Ready(None);
        };
        match Pin::new(sub).poll_next(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(event))),
            Poll::Ready(None) => {
                this.state = StreamState::Done;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<E: ChannelEvent> Unpin for EventStream<E> {}

impl<E: ChannelEvent> FusedStream for EventStream<E> {
    fn is_terminated(&self) -> bool {
        matches!(self.state, StreamState::Done)
    }
}

impl<E: ChannelEvent> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            StreamState::Idle { .. } => "idle",
            StreamState::Attached(_) => "attached",
            StreamState::Done => "done",
        };
        f.debug_struct("EventStream").field("state", &state).finish()
    }
}
