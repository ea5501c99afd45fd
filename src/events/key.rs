//! # Event keys and the event trait.
//!
//! A [`ChannelEvent`] names the sub-channel it travels on through an
//! [`EventKey`]. Keys are typed capability tokens: an `EventKey<E>` can only
//! send and receive values of type `E`.
//!
//! ## Identity
//! Routing never inspects payloads. Two keys address the same queue iff their
//! [`KeyId`]s are equal, and a `KeyId` is the pair `(TypeId of E, name)`:
//! ```text
//! EventKey::<Refresh>::new("refresh")  ─► KeyId(Refresh, "refresh")  ─┐
//! EventKey::<Refresh>::new("refresh")  ─► KeyId(Refresh, "refresh")  ─┴─► same queue
//! EventKey::<Toast>::new("refresh")    ─► KeyId(Toast,   "refresh")  ───► different queue
//! ```
//!
//! ## Example
//! ```rust
//! use keybus::{ChannelEvent, EventKey};
//!
//! #[derive(Debug)]
//! struct Refresh(u32);
//!
//! impl Refresh {
//!     const KEY: EventKey<Refresh> = EventKey::new("refresh");
//! }
//!
//! impl ChannelEvent for Refresh {
//!     fn key(&self) -> EventKey<Self> {
//!         Self::KEY
//!     }
//! }
//!
//! assert_eq!(Refresh(1).key().id(), Refresh::KEY.id());
//! assert_eq!(Refresh::KEY.name(), "refresh");
//! ```

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A message that can travel through a [`ChannelEventBus`](crate::ChannelEventBus).
///
/// Every event is tagged with exactly one key; the bus enqueues it on that
/// key's queue and hands ownership to the consumer attached there.
pub trait ChannelEvent: Send + Sized + 'static {
    /// Returns the key this event is routed by.
    fn key(&self) -> EventKey<Self>;
}

/// Typed key naming one logical sub-channel of the bus.
///
/// Cheap to copy and usable in `const` position, so the usual pattern is one
/// associated constant per event type.
pub struct EventKey<E> {
    name: &'static str,
    _marker: PhantomData<fn() -> E>,
}

impl<E> EventKey<E> {
    /// Creates a key with a diagnostic name.
    ///
    /// The name takes part in identity: keys of the same event type with
    /// different names address different queues.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the diagnostic name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<E: 'static> EventKey<E> {
    /// Returns the type-erased identity used by the registry.
    #[inline]
    pub fn id(&self) -> KeyId {
        KeyId {
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            name: self.name,
        }
    }
}

impl<E: 'static> From<EventKey<E>> for KeyId {
    fn from(key: EventKey<E>) -> Self {
        key.id()
    }
}

impl<E> Clone for EventKey<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EventKey<E> {}

impl<E> fmt::Debug for EventKey<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventKey").field(&self.name).finish()
    }
}

impl<E: 'static> PartialEq for EventKey<E> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<E: 'static> Eq for EventKey<E> {}

/// Type-erased key identity.
///
/// Equality and hashing use the event's `TypeId` and the key name;
/// `type_name` is carried for display only.
#[derive(Clone, Copy)]
pub struct KeyId {
    type_id: TypeId,
    type_name: &'static str,
    name: &'static str,
}

impl KeyId {
    /// Returns the key name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the event type name (as reported by `std::any::type_name`).
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for KeyId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for KeyId {}

impl Hash for KeyId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({}: {})", self.name, self.type_name)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
