//! # Example: custom_logger
//!
//! Implements [`BusLogger`] to count lifecycle transitions, and shows the
//! close validations failing and succeeding.
//!
//! ## Run
//! ```bash
//! cargo run --example custom_logger
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use keybus::{BusLogger, ChannelEvent, ChannelEventBus, CloseOptions, EventKey, KeyId};

#[derive(Debug)]
enum Nav {
    Back,
    To(&'static str),
}

const NAV: EventKey<Nav> = EventKey::new("nav");

impl ChannelEvent for Nav {
    fn key(&self) -> EventKey<Self> {
        NAV
    }
}

/// Counts transitions and prints them with the bus state.
#[derive(Default)]
struct Counting {
    transitions: AtomicUsize,
}

impl Counting {
    fn bump(&self, what: &str, key: &KeyId, bus: &ChannelEventBus) {
        let n = self.transitions.fetch_add(1, Ordering::Relaxed) + 1;
        println!("[counting #{n}] {what} key={key} open={}", bus.len());
    }
}

impl BusLogger for Counting {
    fn on_created(&self, key: &KeyId, bus: &ChannelEventBus) {
        self.bump("created", key, bus);
    }

    fn on_start_collection(&self, key: &KeyId, bus: &ChannelEventBus) {
        self.bump("start", key, bus);
    }

    fn on_stop_collection(&self, key: &KeyId, bus: &ChannelEventBus) {
        self.bump("stop", key, bus);
    }

    fn on_closed(&self, key: &KeyId, bus: &ChannelEventBus) {
        self.bump("closed", key, bus);
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = Arc::new(Counting::default());
    let bus = ChannelEventBus::builder()
        .with_logger(logger.clone())
        .with_close_options(CloseOptions::strict())
        .build();

    bus.send(Nav::To("settings"))?;
    bus.send(Nav::Back)?;

    // Strict close refuses while events are unread.
    if let Err(err) = bus.close_key(NAV) {
        println!("close refused: {err} ({})", err.as_label());
    }

    let mut sub = bus.subscribe(NAV)?;
    if let Err(err) = bus.close_key(NAV) {
        println!("close refused: {err} ({})", err.as_label());
    }
    if let Err(err) = bus.subscribe(NAV) {
        println!("second consumer refused: {err}");
    }

    while let Some(ev) = sub.try_recv() {
        println!("navigate: {ev:?}");
    }
    drop(sub);

    bus.close_key(NAV)?;
    println!(
        "transitions observed: {}",
        logger.transitions.load(Ordering::Relaxed)
    );
    Ok(())
}
