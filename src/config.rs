//! # Bus configuration.
//!
//! Provides [`Config`], the settings a [`ChannelEventBus`](crate::ChannelEventBus)
//! is built with, and [`CloseOptions`], the validation set applied when a single
//! key is closed.
//!
//! Config is used in two ways:
//! 1. **Bus creation**: `ChannelEventBus::builder().with_config(config)`
//! 2. **Close defaults**: `close_key(key)` applies `config.close_options`;
//!    `close_key_with(key, options)` overrides them per call.

/// Validations evaluated before a key is closed.
///
/// All checks run against the entry *before* removal; the first one that
/// fails aborts the close and leaves the entry untouched.
///
/// ## Field semantics
/// - `require_not_collecting`: fail with `BusIsCollecting` while a consumer is attached
/// - `require_channel_empty`: fail with `BusIsNotEmpty` while unread events remain
/// - `require_exists`: fail with `BusDoesNotExist` if the key has no entry
///   (otherwise closing an absent key is a silent no-op)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloseOptions {
    /// Refuse to close while a subscription is attached.
    pub require_not_collecting: bool,
    /// Refuse to close while the queue holds unread events.
    pub require_channel_empty: bool,
    /// Refuse to close a key that has no entry.
    pub require_exists: bool,
}

impl CloseOptions {
    /// No validation at all: close whatever is there, ignore absent keys.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            require_not_collecting: false,
            require_channel_empty: false,
            require_exists: false,
        }
    }

    /// Every validation enabled.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            require_not_collecting: true,
            require_channel_empty: true,
            require_exists: true,
        }
    }

    /// Sets `require_not_collecting`.
    #[must_use]
    pub const fn not_collecting(mut self, on: bool) -> Self {
        self.require_not_collecting = on;
        self
    }

    /// Sets `require_channel_empty`.
    #[must_use]
    pub const fn channel_empty(mut self, on: bool) -> Self {
        self.require_channel_empty = on;
        self
    }

    /// Sets `require_exists`.
    #[must_use]
    pub const fn exists(mut self, on: bool) -> Self {
        self.require_exists = on;
        self
    }
}

impl Default for CloseOptions {
    /// Default validation:
    ///
    /// - `require_not_collecting = true` (never pull a queue out from under a consumer)
    /// - `require_channel_empty = false` (unread events are dropped with the queue)
    /// - `require_exists = true` (closing an unknown key is reported)
    fn default() -> Self {
        Self {
            require_not_collecting: true,
            require_channel_empty: false,
            require_exists: true,
        }
    }
}

/// Configuration for a [`ChannelEventBus`](crate::ChannelEventBus).
///
/// All fields are public; start from `Config::default()` and override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Validation applied by `close_key`.
    pub close_options: CloseOptions,
}
