//! # StdoutLogger — simple lifecycle printer
//!
//! A minimal logger that prints every lifecycle callback to stdout together
//! with the current bus state. Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [created] key=refresh bus=ChannelEventBus { entries: [...], logger: "stdout" }
//! [start-collection] key=refresh bus=...
//! [stop-collection] key=refresh bus=...
//! [closed] key=refresh bus=...
//! [closed-all] keys=[refresh, toast] bus=...
//! ```

use crate::core::ChannelEventBus;
use crate::events::KeyId;
use crate::loggers::BusLogger;

/// Stdout printing logger.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutLogger;

impl StdoutLogger {
    /// Construct a new [`StdoutLogger`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn line(tag: &str, key: &KeyId, bus: &ChannelEventBus) -> String {
        format!("[{tag}] key={key} bus={bus:?}")
    }

    pub(crate) fn all_line(keys: &[KeyId], bus: &ChannelEventBus) -> String {
        let names: Vec<&str> = keys.iter().map(KeyId::name).collect();
        format!("[closed-all] keys=[{}] bus={bus:?}", names.join(", "))
    }
}

impl BusLogger for StdoutLogger {
    fn on_created(&self, key: &KeyId, bus: &ChannelEventBus) {
        println!("{}", Self::line("created", key, bus));
    }

    fn on_start_collection(&self, key: &KeyId, bus: &ChannelEventBus) {
        println!("{}", Self::line("start-collection", key, bus));
    }

    fn on_stop_collection(&self, key: &KeyId, bus: &ChannelEventBus) {
        println!("{}", Self::line("stop-collection", key, bus));
    }

    fn on_closed(&self, key: &KeyId, bus: &ChannelEventBus) {
        println!("{}", Self::line("closed", key, bus));
    }

    fn on_closed_all(&self, keys: &[KeyId], bus: &ChannelEventBus) {
        println!("{}", Self::all_line(keys, bus));
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
