//! Event keys: the routing vocabulary of the bus.
//!
//! ## Contents
//! - [`ChannelEvent`] trait implemented by every message type
//! - [`EventKey`] typed key token, one per logical sub-channel
//! - [`KeyId`] type-erased key identity used by the registry and loggers
//!
//! See `core/mod.rs` for how keys flow through the registry.

mod key;

pub use key::{ChannelEvent, EventKey, KeyId};
