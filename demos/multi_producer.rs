//! # Example: multi_producer
//!
//! One consumer, one hundred producers spread over a multi-threaded runtime.
//! Lifecycle events are reported through [`TracingLogger`].
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example multi_producer
//! ```

use std::sync::Arc;
use std::time::Duration;

use keybus::{ChannelEvent, ChannelEventBus, EventKey, TracingLogger};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct AwesomeEvent {
    payload: u32,
}

impl AwesomeEvent {
    const KEY: EventKey<AwesomeEvent> = EventKey::new("awesome");
}

impl ChannelEvent for AwesomeEvent {
    fn key(&self) -> EventKey<Self> {
        Self::KEY
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let bus = ChannelEventBus::builder()
        .with_logger(Arc::new(TracingLogger::new()))
        .build();

    let producers = {
        let bus = bus.clone();
        tokio::spawn(async move {
            for payload in 0..100 {
                let bus = bus.clone();
                let sent = tokio::spawn(async move {
                    println!(
                        "[SENT] >>> {payload} on {:?}",
                        std::thread::current().name()
                    );
                    bus.send(AwesomeEvent { payload })
                })
                .await;
                if let Ok(Err(err)) = sent {
                    eprintln!("send failed: {err}");
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
    };

    let consumer = {
        let bus = bus.clone();
        tokio::spawn(async move {
            let mut sub = match bus.subscribe(AwesomeEvent::KEY) {
                Ok(sub) => sub,
                Err(err) => {
                    eprintln!("cannot collect: {err}");
                    return;
                }
            };
            while let Some(ev) = sub.recv().await {
                println!(
                    "[RECEIVED] <<< {} on {:?}",
                    ev.payload,
                    std::thread::current().name()
                );
            }
        })
    };

    producers.await?;
    bus.close_key_with(AwesomeEvent::KEY, keybus::CloseOptions::none())?;
    consumer.await?;
    Ok(())
}
