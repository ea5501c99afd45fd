//! Bus core: registry, facade and subscriptions.
//!
//! The only public API from this module is [`ChannelEventBus`] and the
//! consumer types it hands out.
//!
//! Internal modules:
//! - [`registry`]: the locked key → entry table and its bookkeeping;
//! - [`bus`]: the public facade (send / subscribe / close) and logger dispatch;
//! - [`subscription`]: RAII collecting claim and the lazy stream built on it;
//! - [`builder`]: construction with config and logger.
//!
//! ```text
//! ChannelEventBus ──► Registry ──► Entry (per key) ──► Subscription / EventStream
//!        │
//!        └──► BusLogger
//! ```

mod builder;
mod bus;
mod registry;
mod subscription;

pub use builder::ChannelEventBusBuilder;
pub use bus::ChannelEventBus;
pub use registry::EntrySnapshot;
pub use subscription::{EventStream, Subscription};
