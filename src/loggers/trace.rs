//! # TracingLogger — lifecycle events as `tracing` records
//!
//! Entry creation and closing are reported at `INFO`, collection changes at
//! `DEBUG`. Every record carries the key name and event type as fields, plus
//! the number of open keys.

use tracing::{debug, info};

use crate::core::ChannelEventBus;
use crate::events::KeyId;
use crate::loggers::BusLogger;

/// Logger that forwards lifecycle callbacks to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Construct a new [`TracingLogger`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BusLogger for TracingLogger {
    fn on_created(&self, key: &KeyId, bus: &ChannelEventBus) {
        info!(key = %key, event_type = key.type_name(), open = bus.len(), "bus entry created");
    }

    fn on_start_collection(&self, key: &KeyId, bus: &ChannelEventBus) {
        debug!(key = %key, pending = bus.pending(*key), "collection started");
    }

    fn on_stop_collection(&self, key: &KeyId, bus: &ChannelEventBus) {
        debug!(key = %key, pending = bus.pending(*key), "collection stopped");
    }

    fn on_closed(&self, key: &KeyId, bus: &ChannelEventBus) {
        info!(key = %key, event_type = key.type_name(), open = bus.len(), "bus entry closed");
    }

    fn on_closed_all(&self, keys: &[KeyId], _bus: &ChannelEventBus) {
        info!(closed = keys.len(), keys = ?keys, "all bus entries closed");
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
