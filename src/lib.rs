//! # keybus
//!
//! **keybus** is a process-local keyed event bus for Rust.
//!
//! It keeps one unbounded FIFO queue per typed key. Any number of producers
//! may send to a key from any thread; at most one consumer may drain it at a
//! time. Events sent before a consumer attaches are kept until one does.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  producer A  │   │  producer B  │   │  producer C  │
//!     │ send(Toast)  │   │ send(Toast)  │   │ send(Nav)    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ChannelEventBus (facade)                                         │
//! │  - Registry: Mutex<HashMap<KeyId, Entry>>                         │
//! │  - Entry: unbounded FIFO + is_collecting flag                     │
//! │  - BusLogger (created / start / stop / closed / closed-all)       │
//! └──────┬────────────────────────────────────────────┬───────────────┘
//!        ▼                                            ▼
//!  [queue "toast"] ──► Subscription<Toast>      [queue "nav"] (no consumer:
//!   (one consumer)      recv() / Stream            events retained)
//! ```
//!
//! ### Collecting claim
//! ```text
//! subscribe / first poll of receive_as_stream
//!   ├─► Idle → Collecting    (second attach ─► FlowAlreadyCollected)
//!   ├─► drain FIFO, pending while empty
//!   └─► drop / completion / cancellation / panic ─► Collecting → Idle
//!
//! close_key(key, CloseOptions)
//!   ├─► require_exists         ─► BusDoesNotExist
//!   ├─► require_not_collecting ─► BusIsCollecting
//!   ├─► require_channel_empty  ─► BusIsNotEmpty
//!   └─► remove entry, close queue (consumer drains, then ends)
//!
//! close() ─► remove every entry, no validation, never fails
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Keys**          | Typed key tokens with type-qualified identity.                | [`EventKey`], [`KeyId`], [`ChannelEvent`]   |
//! | **Bus**           | Send, subscribe, close keys.                                  | [`ChannelEventBus`]                         |
//! | **Consumers**     | Exclusive RAII subscriptions and lazy streams.                | [`Subscription`], [`EventStream`]           |
//! | **Loggers**       | Observe entry lifecycle.                                      | [`BusLogger`], [`TracingLogger`]            |
//! | **Errors**        | Typed errors for send, subscribe and close.                   | [`SendError`], [`FlowAlreadyCollected`], [`CloseError`] |
//! | **Configuration** | Default close validation.                                     | [`Config`], [`CloseOptions`]                |
//!
//! ## Optional features
//! - `logging` (default): exports a simple built-in [`StdoutLogger`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use keybus::{ChannelEvent, ChannelEventBus, EventKey};
//!
//! #[derive(Debug, PartialEq)]
//! struct Demo(u32);
//!
//! impl Demo {
//!     const KEY: EventKey<Demo> = EventKey::new("demo");
//! }
//!
//! impl ChannelEvent for Demo {
//!     fn key(&self) -> EventKey<Self> {
//!         Self::KEY
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = ChannelEventBus::new();
//!
//!     // Sent before anyone listens: retained.
//!     bus.send(Demo(1))?;
//!     bus.send(Demo(2))?;
//!
//!     let mut events = bus.receive_as_stream(Demo::KEY);
//!     assert_eq!(events.next().await.transpose()?, Some(Demo(1)));
//!     assert_eq!(events.next().await.transpose()?, Some(Demo(2)));
//!
//!     // Releasing the stream frees the key for the next consumer.
//!     drop(events);
//!     bus.close_key(Demo::KEY)?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod loggers;

// ---- Public re-exports ----

pub use crate::core::{
    ChannelEventBus, ChannelEventBusBuilder, EntrySnapshot, EventStream, Subscription,
};
pub use config::{CloseOptions, Config};
pub use error::{CloseError, FlowAlreadyCollected, SendCause, SendError};
pub use events::{ChannelEvent, EventKey, KeyId};
pub use loggers::{BusLogger, NoopLogger, TracingLogger};

// Optional: expose a simple built-in stdout logger (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use loggers::StdoutLogger;
