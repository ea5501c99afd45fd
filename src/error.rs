//! Error types used by the keyed event bus.
//!
//! Every bus operation reports its failure synchronously with one of:
//!
//! - [`SendError`] — an enqueue was rejected (`send`).
//! - [`FlowAlreadyCollected`] — a second consumer tried to attach to a key.
//! - [`CloseError`] — a `close_key` validation failed.
//!
//! None of them are fatal to the bus: a failed operation leaves the registry
//! exactly as it was. All types provide `as_label` for logs/metrics.

use std::fmt;

use thiserror::Error;

use crate::events::KeyId;

/// Why an enqueue was rejected.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendCause {
    /// The queue's receiving half is gone (the entry was closed while the
    /// producer still held its handle).
    #[error("queue is closed")]
    QueueClosed,
}

/// # Event could not be enqueued.
///
/// Carries the rejected event back to the producer.
#[derive(Error)]
#[error("failed to send event to `{key}`: {cause}")]
pub struct SendError<E> {
    /// The event that was not delivered.
    pub event: E,
    /// Key the event was routed to.
    pub key: KeyId,
    /// Reason for the rejection.
    #[source]
    pub cause: SendCause,
}

impl<E> SendError<E> {
    /// Consumes the error, returning the rejected event.
    pub fn into_event(self) -> E {
        self.event
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        "failed_to_send_event"
    }
}

impl<E> fmt::Debug for SendError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError")
            .field("key", &self.key)
            .field("cause", &self.cause)
            .finish_non_exhaustive()
    }
}

/// # A consumer is already attached to this key.
///
/// Only one subscription may drain a key at a time; the existing one must
/// complete or be dropped before another can attach.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("flow for `{key}` is already being collected")]
pub struct FlowAlreadyCollected {
    /// The contended key.
    pub key: KeyId,
}

impl FlowAlreadyCollected {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        "flow_already_collected"
    }
}

/// # Validation failures of `close_key`.
///
/// Each variant corresponds to one [`CloseOptions`](crate::CloseOptions) flag.
/// A failed close leaves the entry in place and fully usable.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseError {
    /// No entry exists for the key (`require_exists`).
    #[error("bus for `{key}` does not exist")]
    BusDoesNotExist {
        /// The requested key.
        key: KeyId,
    },

    /// A consumer is still attached (`require_not_collecting`).
    #[error("bus for `{key}` is being collected")]
    BusIsCollecting {
        /// The requested key.
        key: KeyId,
    },

    /// Unread events remain in the queue (`require_channel_empty`).
    #[error("bus for `{key}` is not empty")]
    BusIsNotEmpty {
        /// The requested key.
        key: KeyId,
    },
}

impl CloseError {
    /// Returns the key the failed close was requested for.
    pub fn key(&self) -> KeyId {
        match self {
            CloseError::BusDoesNotExist { key }
            | CloseError::BusIsCollecting { key }
            | CloseError::BusIsNotEmpty { key } => *key,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use keybus::{CloseError, EventKey};
    ///
    /// struct Ping;
    /// let key = EventKey::<Ping>::new("ping").id();
    ///
    /// let err = CloseError::BusIsCollecting { key };
    /// assert_eq!(err.as_label(), "bus_is_collecting");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CloseError::BusDoesNotExist { .. } => "bus_does_not_exist",
            CloseError::BusIsCollecting { .. } => "bus_is_collecting",
            CloseError::BusIsNotEmpty { .. } => "bus_is_not_empty",
        }
    }
}
