//! End-to-end behaviour of the keyed bus: retention, exclusivity, close
//! validation and concurrent producers.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use keybus::{
    ChannelEvent, ChannelEventBus, CloseError, CloseOptions, EventKey, FlowAlreadyCollected,
};
use tokio::sync::oneshot;
use tokio::time::timeout;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Demo(u32);

impl Demo {
    const KEY: EventKey<Demo> = EventKey::new("demo");
}

impl ChannelEvent for Demo {
    fn key(&self) -> EventKey<Self> {
        Self::KEY
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tagged {
    producer: usize,
    seq: usize,
}

impl Tagged {
    const KEY: EventKey<Tagged> = EventKey::new("tagged");
}

impl ChannelEvent for Tagged {
    fn key(&self) -> EventKey<Self> {
        Self::KEY
    }
}

const SHORT: Duration = Duration::from_millis(50);

#[tokio::test]
async fn sent_events_are_delivered_in_order_then_pending() {
    let bus = ChannelEventBus::new();
    for i in 0..10 {
        bus.send(Demo(i)).unwrap();
    }

    let mut sub = bus.subscribe(Demo::KEY).unwrap();
    for i in 0..10 {
        assert_eq!(sub.recv().await, Some(Demo(i)));
    }
    assert!(timeout(SHORT, sub.recv()).await.is_err(), "queue should be empty");
}

#[tokio::test]
async fn send_while_subscribed_is_observed_next() {
    let bus = ChannelEventBus::new();
    bus.send(Demo(1)).unwrap();
    bus.send(Demo(2)).unwrap();

    let mut events = bus.receive_as_stream(Demo::KEY);
    assert_eq!(events.next().await.unwrap().unwrap(), Demo(1));
    assert_eq!(events.next().await.unwrap().unwrap(), Demo(2));

    let producer = bus.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        producer.send(Demo(3)).unwrap();
    });
    assert_eq!(events.next().await.unwrap().unwrap(), Demo(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_subscriber_fails_until_first_is_cancelled() {
    let bus = ChannelEventBus::new();
    let (attached_tx, attached_rx) = oneshot::channel();
    bus.send(Demo(0)).unwrap();

    let consumer = {
        let bus = bus.clone();
        tokio::spawn(async move {
            let mut events = bus.receive_as_stream(Demo::KEY);
            assert_eq!(events.next().await.unwrap().unwrap(), Demo(0));
            let _ = attached_tx.send(());
            while events.next().await.is_some() {}
        })
    };

    attached_rx.await.unwrap();
    assert!(bus.is_collecting(Demo::KEY));

    let err = bus.subscribe(Demo::KEY).unwrap_err();
    assert_eq!(err, FlowAlreadyCollected { key: Demo::KEY.id() });

    consumer.abort();
    assert!(consumer.await.unwrap_err().is_cancelled());

    assert!(!bus.is_collecting(Demo::KEY));
    let _retry = bus.subscribe(Demo::KEY).unwrap();
}

#[tokio::test]
async fn claim_is_released_when_consumer_panics() {
    let bus = ChannelEventBus::new();
    bus.send(Demo(1)).unwrap();

    let consumer = {
        let bus = bus.clone();
        tokio::spawn(async move {
            let mut sub = bus.subscribe(Demo::KEY).unwrap();
            let ev = sub.recv().await;
            panic!("consumer failed on {ev:?}");
        })
    };
    assert!(consumer.await.unwrap_err().is_panic());

    assert!(!bus.is_collecting(Demo::KEY));
    assert!(bus.subscribe(Demo::KEY).is_ok());
}

#[tokio::test]
async fn claim_is_released_when_stream_completes() {
    let bus = ChannelEventBus::new();
    bus.send(Demo(1)).unwrap();

    let mut events = bus.receive_as_stream(Demo::KEY);
    assert_eq!(events.next().await.unwrap().unwrap(), Demo(1));

    bus.close_key_with(Demo::KEY, CloseOptions::none()).unwrap();
    assert!(events.next().await.is_none());
    assert!(!events.is_attached());

    // The key was closed; a new consumer gets a fresh entry.
    let mut again = bus.receive_as_stream(Demo::KEY);
    bus.send(Demo(2)).unwrap();
    assert_eq!(again.next().await.unwrap().unwrap(), Demo(2));
}

#[tokio::test]
async fn close_key_refuses_while_collecting() {
    let bus = ChannelEventBus::new();
    let sub = bus.subscribe(Demo::KEY).unwrap();

    assert_eq!(
        bus.close_key(Demo::KEY),
        Err(CloseError::BusIsCollecting { key: Demo::KEY.id() })
    );
    assert!(bus.contains_key(Demo::KEY));

    drop(sub);
    bus.close_key(Demo::KEY).unwrap();
    assert!(!bus.contains_key(Demo::KEY));
}

#[tokio::test]
async fn close_key_requiring_empty_channel() {
    let bus = ChannelEventBus::new();
    let require_empty = CloseOptions::default().channel_empty(true);

    bus.send(Demo(1)).unwrap();
    bus.send(Demo(2)).unwrap();
    assert_eq!(
        bus.close_key_with(Demo::KEY, require_empty),
        Err(CloseError::BusIsNotEmpty { key: Demo::KEY.id() })
    );

    {
        let mut sub = bus.subscribe(Demo::KEY).unwrap();
        assert_eq!(sub.recv().await, Some(Demo(1)));
        assert_eq!(sub.recv().await, Some(Demo(2)));
    }
    bus.close_key_with(Demo::KEY, require_empty).unwrap();
}

#[tokio::test]
async fn close_key_requiring_existence() {
    let bus = ChannelEventBus::new();
    let missing = Err(CloseError::BusDoesNotExist { key: Demo::KEY.id() });

    assert_eq!(bus.close_key(Demo::KEY), missing);

    bus.send(Demo(1)).unwrap();
    bus.close_key(Demo::KEY).unwrap();
    assert_eq!(bus.close_key(Demo::KEY), missing);

    bus.close_key_with(Demo::KEY, CloseOptions::default().exists(false))
        .unwrap();
}

#[tokio::test]
async fn close_all_terminates_active_subscriber() {
    let bus = ChannelEventBus::new();
    bus.send(Tagged { producer: 0, seq: 0 }).unwrap();

    let mut sub = bus.subscribe(Demo::KEY).unwrap();
    bus.send(Demo(1)).unwrap();
    bus.send(Demo(2)).unwrap();

    bus.close();
    assert!(bus.is_empty());

    assert_eq!(sub.recv().await, Some(Demo(1)));
    assert_eq!(sub.recv().await, Some(Demo(2)));
    assert_eq!(timeout(SHORT, sub.recv()).await, Ok(None));

    // Dropping the orphaned subscription must not resurrect the key.
    drop(sub);
    assert!(!bus.contains_key(Demo::KEY));
}

#[tokio::test]
async fn keys_are_independent() {
    let bus = ChannelEventBus::new();
    let other: EventKey<Demo> = EventKey::new("other");

    struct Other(u32);
    impl ChannelEvent for Other {
        fn key(&self) -> EventKey<Self> {
            EventKey::new("other")
        }
    }

    bus.send(Demo(1)).unwrap();
    bus.send(Other(2)).unwrap();
    assert_eq!(bus.len(), 2);

    // Same name, different event type: a different queue that nobody sent to.
    let mut sub = bus.subscribe(other).unwrap();
    assert!(sub.try_recv().is_none());
    assert_eq!(bus.len(), 3);

    let mut demo = bus.subscribe(Demo::KEY).unwrap();
    assert_eq!(demo.try_recv(), Some(Demo(1)));
}

#[test]
fn many_producer_threads_one_consumer() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 500;

    let bus = Arc::new(ChannelEventBus::new());
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let consumer = {
        let bus = Arc::clone(&bus);
        rt.spawn(async move {
            let mut sub = bus.subscribe(Tagged::KEY).unwrap();
            let mut next_seq = vec![0usize; PRODUCERS];
            for _ in 0..PRODUCERS * PER_PRODUCER {
                let ev = sub.recv().await.unwrap();
                assert_eq!(ev.seq, next_seq[ev.producer], "per-producer order broken");
                next_seq[ev.producer] += 1;
            }
            next_seq
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let bus = Arc::clone(&bus);
            std::thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    bus.send(Tagged { producer, seq }).unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    let counts = rt.block_on(consumer).unwrap();
    assert!(counts.iter().all(|&n| n == PER_PRODUCER));
    assert_eq!(bus.pending(Tagged::KEY), 0);
}
