//! # Integration Tests
//!
//! Property and end-to-end tests for the data-channel event bridge.
//!
//! Covers:
//! - Ordering, loss, and duplication properties under concurrent producers
//! - Batch coalescing bounds and envelope shape
//! - Attach/detach scenarios driven through the stream-handler surface

#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::time::{Duration, Instant};

    use contracts::{ChannelError, EventSink, EventValue, StreamHandler};
    use dispatcher::{
        DataChannelEventDispatcher, InlineRunner, MockDataChannel, MockEventChannelRegistry,
        RecordingSink,
    };

    /// A dispatcher wired to a mock channel through a mock registry
    pub struct Bridge {
        pub dispatcher: Arc<DataChannelEventDispatcher>,
        pub channel: Arc<MockDataChannel>,
        registry: MockEventChannelRegistry,
    }

    impl Bridge {
        pub fn new(channel_id: i32) -> Self {
            let registry = MockEventChannelRegistry::new();
            let channel = Arc::new(MockDataChannel::new(channel_id));
            let dispatcher = DataChannelEventDispatcher::register(
                &registry,
                "pc0",
                &channel_id.to_string(),
                channel.clone(),
                Arc::new(InlineRunner),
            )
            .unwrap();
            Self {
                dispatcher,
                channel,
                registry,
            }
        }

        /// Attach a sink the way the application layer does: through the
        /// registered stream handler.
        pub fn attach(&self, sink: Arc<dyn EventSink>) {
            self.handler().on_listen(None, sink);
        }

        pub fn detach(&self) {
            self.handler().on_cancel(None);
        }

        fn handler(&self) -> Arc<dyn StreamHandler> {
            self.registry
                .handler(self.dispatcher.stream_name())
                .unwrap()
        }
    }

    pub fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if pred() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        pred()
    }

    /// Sink whose first delivery parks until the test releases it
    ///
    /// Lets a test pin the drain worker mid-delivery and build a backlog with
    /// deterministic batch boundaries.
    pub struct BlockingSink {
        inner: RecordingSink,
        entered_tx: mpsc::Sender<()>,
        release_rx: Mutex<mpsc::Receiver<()>>,
        first_pending: AtomicBool,
    }

    impl BlockingSink {
        /// Returns the sink, a receiver signalled when the first delivery
        /// enters, and a sender that releases it.
        pub fn new(name: &str) -> (Arc<Self>, mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = mpsc::channel();
            let (release_tx, release_rx) = mpsc::channel();
            let sink = Arc::new(Self {
                inner: RecordingSink::new(name),
                entered_tx,
                release_rx: Mutex::new(release_rx),
                first_pending: AtomicBool::new(true),
            });
            (sink, entered_rx, release_tx)
        }

        pub fn events(&self) -> Vec<EventValue> {
            self.inner.events()
        }

        pub fn flattened(&self) -> Vec<EventValue> {
            self.inner.flattened()
        }
    }

    impl EventSink for BlockingSink {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn add(&self, event: EventValue) -> Result<(), ChannelError> {
            if self.first_pending.swap(false, Ordering::SeqCst) {
                let _ = self.entered_tx.send(());
                let _ = self.release_rx.lock().unwrap().recv();
            }
            self.inner.add(event)
        }
    }
}

#[cfg(test)]
mod property_tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{ChannelError, EventSink, EventValue, MessageBuffer, EVENT_BATCH};
    use dispatcher::{DataChannelEvents, RecordingSink, MAX_BATCH_SIZE};

    use crate::support::{wait_until, Bridge};

    fn spawn_producers(
        bridge: &Bridge,
        producers: usize,
        per_producer: usize,
    ) -> Vec<std::thread::JoinHandle<()>> {
        (0..producers)
            .map(|p| {
                let dispatcher = Arc::clone(&bridge.dispatcher);
                std::thread::spawn(move || {
                    for seq in 0..per_producer {
                        dispatcher.on_message(MessageBuffer::text(format!("p{p}-{seq:05}")));
                    }
                })
            })
            .collect()
    }

    fn labels(events: &[EventValue]) -> Vec<String> {
        events
            .iter()
            .map(|e| {
                e.as_record()
                    .and_then(|r| r.get_str("data"))
                    .expect("delivered value is a message record")
                    .to_string()
            })
            .collect()
    }

    /// Per-producer enqueue order survives to the sink, with nothing lost
    /// and nothing duplicated.
    #[test]
    fn test_fifo_per_producer_no_loss_no_duplication() {
        let bridge = Bridge::new(1);
        let sink = Arc::new(RecordingSink::new("fifo"));
        bridge.attach(sink.clone());

        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 500;
        for handle in spawn_producers(&bridge, PRODUCERS, PER_PRODUCER) {
            handle.join().unwrap();
        }

        assert!(wait_until(Duration::from_secs(10), || {
            sink.flattened().len() == PRODUCERS * PER_PRODUCER
        }));

        let observed = labels(&sink.flattened());
        let unique: HashSet<&String> = observed.iter().collect();
        assert_eq!(unique.len(), PRODUCERS * PER_PRODUCER);

        for p in 0..PRODUCERS {
            let prefix = format!("p{p}-");
            let subsequence: Vec<&String> = observed
                .iter()
                .filter(|label| label.starts_with(&prefix))
                .collect();
            let expected: Vec<String> =
                (0..PER_PRODUCER).map(|seq| format!("p{p}-{seq:05}")).collect();
            assert_eq!(subsequence.len(), PER_PRODUCER);
            for (observed, expected) in subsequence.iter().zip(&expected) {
                assert_eq!(*observed, expected);
            }
        }
    }

    /// No delivered envelope exceeds the batch bound and none nests another
    /// envelope.
    #[test]
    fn test_batch_bound_and_no_nesting() {
        let bridge = Bridge::new(2);
        let sink = Arc::new(RecordingSink::new("bound"));

        // Build a large backlog first so coalescing actually happens.
        for seq in 0..500 {
            bridge
                .dispatcher
                .on_message(MessageBuffer::text(format!("{seq}")));
        }
        bridge.attach(sink.clone());

        assert!(wait_until(Duration::from_secs(10), || {
            sink.flattened().len() == 500
        }));

        let mut saw_batch = false;
        for event in sink.events() {
            let record = event.as_record().unwrap();
            if record.event_name() != Some(EVENT_BATCH) {
                continue;
            }
            saw_batch = true;
            let inner = record.get_list("events").unwrap();
            assert!(inner.len() <= MAX_BATCH_SIZE);
            assert!(inner.len() >= 2);
            for leaf in inner {
                assert_ne!(leaf.as_record().unwrap().event_name(), Some(EVENT_BATCH));
            }
        }
        assert!(saw_batch);
    }

    /// Sink instrumented for concurrent entries: deliveries never overlap.
    struct ConcurrencyProbeSink {
        active: AtomicUsize,
        max_active: AtomicUsize,
        delivered: AtomicUsize,
    }

    impl ConcurrencyProbeSink {
        fn new() -> Self {
            Self {
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                delivered: AtomicUsize::new(0),
            }
        }
    }

    impl EventSink for ConcurrencyProbeSink {
        fn name(&self) -> &str {
            "probe"
        }

        fn add(&self, event: EventValue) -> Result<(), ChannelError> {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            std::thread::sleep(Duration::from_micros(200));

            let record = event.as_record().unwrap();
            let count = if record.event_name() == Some(EVENT_BATCH) {
                record.get_list("events").unwrap().len()
            } else {
                1
            };
            self.delivered.fetch_add(count, Ordering::SeqCst);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// At most one drain worker runs per dispatcher at any instant.
    #[test]
    fn test_at_most_one_worker() {
        let bridge = Bridge::new(3);
        let sink = Arc::new(ConcurrencyProbeSink::new());
        bridge.attach(sink.clone());

        const TOTAL: usize = 8 * 250;
        for handle in spawn_producers(&bridge, 8, 250) {
            handle.join().unwrap();
        }

        assert!(wait_until(Duration::from_secs(30), || {
            sink.delivered.load(Ordering::SeqCst) == TOTAL
        }));
        assert_eq!(sink.max_active.load(Ordering::SeqCst), 1);
    }

    /// Every record pushed by a storm of producers arrives within a bounded
    /// wait after the last push: no lost wakeups.
    #[test]
    fn test_no_lost_wakeup_under_storm() {
        let bridge = Bridge::new(4);
        let sink = Arc::new(RecordingSink::new("storm"));
        bridge.attach(sink.clone());

        const TOTAL: usize = 10_000;
        for handle in spawn_producers(&bridge, 4, TOTAL / 4) {
            handle.join().unwrap();
        }

        assert!(
            wait_until(Duration::from_secs(30), || sink.flattened().len() == TOTAL),
            "expected all {TOTAL} records, saw {}",
            sink.flattened().len()
        );
        assert!(wait_until(Duration::from_secs(5), || {
            bridge.dispatcher.metrics().delivered_count() == TOTAL as u64
        }));
        assert_eq!(bridge.dispatcher.metrics().enqueued_count(), TOTAL as u64);
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{
        DataChannelState, MessageBuffer, EVENT_BATCH, EVENT_RECEIVE_MESSAGE, EVENT_STATE_CHANGED,
    };
    use dispatcher::{DataChannelEvents, RecordingSink, MAX_BATCH_SIZE};

    use crate::support::{wait_until, BlockingSink, Bridge};

    /// S1: one text message on an attached sink arrives as a bare record.
    #[test]
    fn test_single_text_message() {
        let bridge = Bridge::new(7);
        let sink = Arc::new(RecordingSink::new("s1"));
        bridge.attach(sink.clone());

        bridge.dispatcher.on_message(MessageBuffer::text("hi"));

        assert!(wait_until(Duration::from_secs(5), || sink.events().len() == 1));
        let events = sink.events();
        let record = events[0].as_record().unwrap();
        assert_eq!(record.event_name(), Some(EVENT_RECEIVE_MESSAGE));
        assert_eq!(record.get_int("id"), Some(7));
        assert_eq!(record.get_str("type"), Some("text"));
        assert_eq!(record.get_str("data"), Some("hi"));
    }

    /// S2: a rapid burst of 50 flow-control events coalesces into one full
    /// envelope plus the remainder, in order.
    #[test]
    fn test_coalesced_burst() {
        let bridge = Bridge::new(3);
        let (sink, entered_rx, release_tx) = BlockingSink::new("s2");
        bridge.attach(sink.clone());

        bridge.dispatcher.on_buffered_amount_change(1);
        // The first delivery is now parked inside the sink; everything pushed
        // from here on piles up behind it.
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        for delta in 2..=50 {
            bridge.dispatcher.on_buffered_amount_change(delta);
        }
        release_tx.send(()).unwrap();

        assert!(wait_until(Duration::from_secs(5), || {
            sink.flattened().len() == 50
        }));

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_ne!(events[0].as_record().unwrap().event_name(), Some(EVENT_BATCH));
        let full = events[1].as_record().unwrap().get_list("events").unwrap();
        assert_eq!(full.len(), MAX_BATCH_SIZE);
        let rest = events[2].as_record().unwrap().get_list("events").unwrap();
        assert_eq!(rest.len(), 50 - 1 - MAX_BATCH_SIZE);

        let deltas: Vec<i64> = sink
            .flattened()
            .iter()
            .map(|e| e.as_record().unwrap().get_long("changedAmount").unwrap())
            .collect();
        assert_eq!(deltas, (1..=50).collect::<Vec<_>>());
        assert_eq!(deltas.iter().sum::<i64>(), 1275);
    }

    /// S3: records pushed with no consumer wait, then drain in order as one
    /// batch of three on attach.
    #[test]
    fn test_backlog_while_detached() {
        let bridge = Bridge::new(5);

        bridge.channel.set_state(DataChannelState::Open);
        bridge.dispatcher.on_state_change();
        bridge.dispatcher.on_message(MessageBuffer::text("x"));
        bridge.channel.set_state(DataChannelState::Closing);
        bridge.dispatcher.on_state_change();

        let sink = Arc::new(RecordingSink::new("s3"));
        bridge.attach(sink.clone());

        assert!(wait_until(Duration::from_secs(5), || {
            sink.flattened().len() == 3
        }));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_record().unwrap().event_name(), Some(EVENT_BATCH));

        let flat = sink.flattened();
        let first = flat[0].as_record().unwrap();
        assert_eq!(first.event_name(), Some(EVENT_STATE_CHANGED));
        assert_eq!(first.get_str("state"), Some("open"));
        let second = flat[1].as_record().unwrap();
        assert_eq!(second.get_str("data"), Some("x"));
        let third = flat[2].as_record().unwrap();
        assert_eq!(third.get_str("state"), Some("closing"));
    }

    /// S4: detaching mid-burst pauses delivery; after re-attach the
    /// remainder arrives in original order with no duplicates.
    #[test]
    fn test_detach_mid_burst() {
        let bridge = Bridge::new(6);
        let sink = Arc::new(RecordingSink::new("s4"));
        bridge.attach(sink.clone());

        for seq in 0..1000 {
            bridge
                .dispatcher
                .on_message(MessageBuffer::text(format!("msg-{seq:04}")));
        }
        assert!(wait_until(Duration::from_secs(5), || {
            !sink.flattened().is_empty()
        }));
        bridge.detach();

        for seq in 1000..2000 {
            bridge
                .dispatcher
                .on_message(MessageBuffer::text(format!("msg-{seq:04}")));
        }
        bridge.attach(sink.clone());

        assert!(wait_until(Duration::from_secs(10), || {
            sink.flattened().len() == 2000
        }));

        let observed: Vec<String> = sink
            .flattened()
            .iter()
            .map(|e| {
                e.as_record()
                    .unwrap()
                    .get_str("data")
                    .unwrap()
                    .to_string()
            })
            .collect();
        let expected: Vec<String> = (0..2000).map(|seq| format!("msg-{seq:04}")).collect();
        assert_eq!(observed, expected);
    }

    /// S5: binary payloads pass through byte-exact.
    #[test]
    fn test_binary_message() {
        let bridge = Bridge::new(2);
        let sink = Arc::new(RecordingSink::new("s5"));
        bridge.attach(sink.clone());

        bridge
            .dispatcher
            .on_message(MessageBuffer::binary(vec![0x00, 0xFF, 0x10]));

        assert!(wait_until(Duration::from_secs(5), || sink.events().len() == 1));
        let events = sink.events();
        let record = events[0].as_record().unwrap();
        assert_eq!(record.event_name(), Some(EVENT_RECEIVE_MESSAGE));
        assert_eq!(record.get_int("id"), Some(2));
        assert_eq!(record.get_str("type"), Some("binary"));
        assert_eq!(
            record.get_bytes("data"),
            Some(&Bytes::from_static(&[0x00, 0xFF, 0x10]))
        );
    }

    /// S6: two runtime-driven producers interleave; each one's order is
    /// preserved in the delivered stream.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_interleaved_producers() {
        let bridge = Bridge::new(8);
        let sink = Arc::new(RecordingSink::new("s6"));
        bridge.attach(sink.clone());

        const PER_PRODUCER: usize = 10_000;
        let mut tasks = Vec::new();
        for prefix in ["A", "B"] {
            let dispatcher = Arc::clone(&bridge.dispatcher);
            tasks.push(tokio::spawn(async move {
                for seq in 0..PER_PRODUCER {
                    dispatcher.on_message(MessageBuffer::text(format!("{prefix}_{seq:05}")));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
        while sink.flattened().len() < 2 * PER_PRODUCER {
            assert!(
                tokio::time::Instant::now() < deadline,
                "delivery stalled at {}",
                sink.flattened().len()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let observed: Vec<String> = sink
            .flattened()
            .iter()
            .map(|e| {
                e.as_record()
                    .unwrap()
                    .get_str("data")
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(observed.len(), 2 * PER_PRODUCER);

        for prefix in ["A", "B"] {
            let tagged = format!("{prefix}_");
            let subsequence: Vec<&String> = observed
                .iter()
                .filter(|label| label.starts_with(&tagged))
                .collect();
            assert_eq!(subsequence.len(), PER_PRODUCER);
            for (seq, label) in subsequence.iter().enumerate() {
                assert_eq!(**label, format!("{prefix}_{seq:05}"));
            }
        }
    }
}
