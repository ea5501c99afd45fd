//! # Lifecycle loggers for the keyed event bus.
//!
//! This module provides the [`BusLogger`] trait and built-in implementations
//! observing entry lifecycle transitions of a [`ChannelEventBus`](crate::ChannelEventBus).
//!
//! ## Architecture
//! ```text
//! Registry op ──► lock released ──► catch_unwind ──► BusLogger callback
//!                                                        │
//!                            ┌───────────────┬──────────┴─────┬──────────┐
//!                            ▼               ▼                ▼          ▼
//!                       NoopLogger     StdoutLogger     TracingLogger  Custom
//! ```
//!
//! ## Callbacks
//! - `on_created`          entry installed (first send or first subscribe)
//! - `on_start_collection` a subscription attached
//! - `on_stop_collection`  the subscription released its claim
//! - `on_closed`           `close_key` removed the entry
//! - `on_closed_all`       `close` removed every entry
//!
//! ## Implementing custom loggers
//! ```rust
//! use keybus::{BusLogger, ChannelEventBus, KeyId};
//!
//! struct Audit;
//!
//! impl BusLogger for Audit {
//!     fn on_closed(&self, key: &KeyId, _bus: &ChannelEventBus) {
//!         eprintln!("audit: {key} closed");
//!     }
//!
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

mod logger;
#[cfg(feature = "logging")]
mod stdout;
mod trace;

pub use logger::{BusLogger, NoopLogger};
#[cfg(feature = "logging")]
pub use stdout::StdoutLogger;
pub use trace::TracingLogger;
