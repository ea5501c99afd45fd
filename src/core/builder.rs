use std::sync::Arc;

use super::bus::ChannelEventBus;
use crate::config::{CloseOptions, Config};
use crate::loggers::{BusLogger, NoopLogger};

/// Builder for constructing a [`ChannelEventBus`] with a custom config or logger.
pub struct ChannelEventBusBuilder {
    cfg: Config,
    logger: Arc<dyn BusLogger>,
}

impl ChannelEventBusBuilder {
    /// Creates a builder with `Config::default()` and a [`NoopLogger`].
    pub fn new() -> Self {
        Self {
            cfg: Config::default(),
            logger: Arc::new(NoopLogger),
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the validation `close_key` applies by default.
    pub fn with_close_options(mut self, options: CloseOptions) -> Self {
        self.cfg.close_options = options;
        self
    }

    /// Sets the lifecycle logger.
    ///
    /// The logger is invoked synchronously from the operation that triggered
    /// it, outside the registry lock.
    pub fn with_logger(mut self, logger: Arc<dyn BusLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Builds the bus.
    pub fn build(self) -> ChannelEventBus {
        ChannelEventBus::from_parts(self.cfg, self.logger)
    }
}

impl Default for ChannelEventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
