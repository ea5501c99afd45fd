//! # Example: basic
//!
//! Walks one key through its whole lifecycle.
//!
//! Shows how to:
//! - Send events before anyone listens (they are retained).
//! - Collect them with [`ChannelEventBus::receive_as_stream`].
//! - Cancel the consumer, close the key, and collect it again.
//!
//! ## Flow
//! ```text
//! send(1), send(2)           ──► retained in queue "demo"
//! receive_as_stream("demo")  ──► 1, 2, then 3, 4 as they are sent
//! abort consumer             ──► claim released
//! close_key("demo")          ──► entry removed
//! send(5), send(6)           ──► fresh entry
//! receive_as_stream("demo")  ──► 5, 6
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic
//! ```

use std::sync::Arc;

use futures::StreamExt;
use keybus::{ChannelEvent, ChannelEventBus, EventKey, StdoutLogger};
use tokio::sync::oneshot;

#[derive(Debug)]
struct DemoEvent(u32);

impl DemoEvent {
    const KEY: EventKey<DemoEvent> = EventKey::new("demo");
}

impl ChannelEvent for DemoEvent {
    fn key(&self) -> EventKey<Self> {
        Self::KEY
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bus = ChannelEventBus::builder()
        .with_logger(Arc::new(StdoutLogger::new()))
        .build();

    bus.send(DemoEvent(1))?;
    bus.send(DemoEvent(2))?;

    let (seen_four, four) = oneshot::channel();
    let consumer = {
        let bus = bus.clone();
        tokio::spawn(async move {
            let mut seen_four = Some(seen_four);
            let mut events = bus.receive_as_stream(DemoEvent::KEY);
            while let Some(ev) = events.next().await {
                match ev {
                    Ok(ev) => {
                        println!(">>>: {ev:?}");
                        if ev.0 == 4 {
                            if let Some(tx) = seen_four.take() {
                                let _ = tx.send(());
                            }
                        }
                    }
                    Err(err) => eprintln!("cannot collect: {err}"),
                }
            }
        })
    };

    bus.send(DemoEvent(3))?;
    bus.send(DemoEvent(4))?;

    four.await?;
    consumer.abort();
    let _ = consumer.await;
    bus.close_key(DemoEvent::KEY)?;

    bus.send(DemoEvent(5))?;
    bus.send(DemoEvent(6))?;

    let mut events = bus.receive_as_stream(DemoEvent::KEY);
    while let Some(ev) = events.next().await {
        let ev = ev?;
        println!(">>>: {ev:?}");
        if ev.0 == 6 {
            break;
        }
    }
    drop(events);

    bus.close();
    Ok(())
}
