//! # Bus logger trait.
//!
//! Provides [`BusLogger`], an observer of entry lifecycle transitions.
//!
//! ## Rules
//! - Callbacks are invoked synchronously by the operation that triggered them,
//!   after the registry lock is released, so they may inspect the bus
//!   (e.g. format it with `{:?}`).
//! - Callbacks never influence control flow: their return is ignored and a
//!   panic is caught, reported via `tracing::error!`, and swallowed.
//! - Keep callbacks short; they run on the producer's or consumer's thread.

use crate::core::ChannelEventBus;
use crate::events::KeyId;

/// Observer of bus lifecycle events.
///
/// Every callback has a no-op default; implement the ones you need.
pub trait BusLogger: Send + Sync + 'static {
    /// An entry was created for `key`.
    fn on_created(&self, key: &KeyId, bus: &ChannelEventBus) {
        let _ = (key, bus);
    }

    /// A subscription attached to `key`.
    fn on_start_collection(&self, key: &KeyId, bus: &ChannelEventBus) {
        let _ = (key, bus);
    }

    /// The subscription on `key` released its claim.
    fn on_stop_collection(&self, key: &KeyId, bus: &ChannelEventBus) {
        let _ = (key, bus);
    }

    /// The entry for `key` was closed by `close_key`.
    fn on_closed(&self, key: &KeyId, bus: &ChannelEventBus) {
        let _ = (key, bus);
    }

    /// Every entry was closed by `close`; `keys` lists the removed keys.
    fn on_closed_all(&self, keys: &[KeyId], bus: &ChannelEventBus) {
        let _ = (keys, bus);
    }

    /// Returns the logger name used in diagnostics.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Logger that ignores every callback. Default for new buses.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl BusLogger for NoopLogger {
    fn name(&self) -> &'static str {
        "noop"
    }
}
