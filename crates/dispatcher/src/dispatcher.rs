//! Data-channel event dispatcher
//!
//! Bridges native data-channel callbacks to the application event stream:
//! encode, queue, coalesce, deliver. One instance exists per channel observer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use contracts::{
    data_channel_stream_name, ChannelError, DataChannelEvents, DataChannelHandle,
    EventChannelRegistry, EventRecord, EventSink, EventValue, MessageBuffer, StreamHandler,
    TaskRunner, EVENT_BATCH,
};
use tracing::{debug, instrument, trace, warn};

use crate::encoder;
use crate::executor::DispatchExecutor;
use crate::metrics::DispatchMetrics;
use crate::queue::EventQueue;
use crate::sink::AnyThreadSink;

/// Largest number of records coalesced into one batch envelope
///
/// Amortizes per-delivery overhead across the process boundary while keeping
/// tail latency bounded.
pub const MAX_BATCH_SIZE: usize = 32;

/// Per-channel event dispatcher
///
/// Producer side: implements [`DataChannelEvents`], callable from any native
/// library thread. Consumer side: implements [`StreamHandler`], so the
/// application layer attaches and detaches its sink through the stream named
/// by [`data_channel_stream_name`]. Deliveries are serialized on the shared
/// dispatch thread and marshalled to the sink's delivery thread.
pub struct DataChannelEventDispatcher {
    core: Arc<DispatchCore>,
    channel: Arc<dyn DataChannelHandle>,
    runner: Arc<dyn TaskRunner>,
}

impl DataChannelEventDispatcher {
    /// Create a dispatcher without registering it (for testing)
    pub fn new(
        peer_connection_id: &str,
        channel_id: &str,
        channel: Arc<dyn DataChannelHandle>,
        runner: Arc<dyn TaskRunner>,
    ) -> Arc<Self> {
        let core = Arc::new_cyclic(|self_handle| DispatchCore {
            stream_name: data_channel_stream_name(peer_connection_id, channel_id),
            queue: EventQueue::new(),
            drain_running: AtomicBool::new(false),
            sink_slot: RwLock::new(None),
            metrics: Arc::new(DispatchMetrics::new()),
            self_handle: self_handle.clone(),
        });
        Arc::new(Self {
            core,
            channel,
            runner,
        })
    }

    /// Create a dispatcher and register it as the stream handler for
    /// `FlutterWebRTC/dataChannelEvent<peer_connection_id><channel_id>`
    #[instrument(
        name = "dispatcher_register",
        skip(registry, channel, runner),
        fields(peer_connection_id = %peer_connection_id, channel_id = %channel_id)
    )]
    pub fn register(
        registry: &dyn EventChannelRegistry,
        peer_connection_id: &str,
        channel_id: &str,
        channel: Arc<dyn DataChannelHandle>,
        runner: Arc<dyn TaskRunner>,
    ) -> Result<Arc<Self>, ChannelError> {
        let dispatcher = Self::new(peer_connection_id, channel_id, channel, runner);
        registry.set_stream_handler(&dispatcher.core.stream_name, dispatcher.clone())?;
        debug!(stream = %dispatcher.core.stream_name, "dispatcher registered");
        Ok(dispatcher)
    }

    /// Stream this dispatcher serves
    pub fn stream_name(&self) -> &str {
        &self.core.stream_name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.core.metrics
    }
}

impl DataChannelEvents for DataChannelEventDispatcher {
    fn on_state_change(&self) {
        self.core.enqueue(encoder::state_changed(self.channel.as_ref()));
    }

    fn on_buffered_amount_change(&self, changed_amount: i64) {
        self.core.enqueue(encoder::buffered_amount_changed(
            self.channel.as_ref(),
            changed_amount,
        ));
    }

    fn on_message(&self, buffer: MessageBuffer) {
        self.core
            .enqueue(encoder::message_received(self.channel.as_ref(), buffer));
    }
}

impl StreamHandler for DataChannelEventDispatcher {
    #[instrument(
        name = "dispatcher_on_listen",
        skip(self, _arguments, sink),
        fields(stream = %self.core.stream_name, sink = sink.name())
    )]
    fn on_listen(&self, _arguments: Option<EventValue>, sink: Arc<dyn EventSink>) {
        let wrapped = AnyThreadSink::new(
            sink,
            Arc::clone(&self.runner),
            Arc::clone(&self.core.metrics),
        );
        self.core.attach(Arc::new(wrapped));
        debug!(stream = %self.core.stream_name, "sink attached");
        // Drain whatever queued up while no consumer was listening.
        self.core.schedule_flush();
    }

    fn on_cancel(&self, _arguments: Option<EventValue>) {
        self.core.detach();
        debug!(stream = %self.core.stream_name, "sink detached");
    }
}

/// Shared queue/scheduler/slot state, kept alive by in-flight drain jobs
struct DispatchCore {
    stream_name: String,
    queue: EventQueue,
    drain_running: AtomicBool,
    sink_slot: RwLock<Option<Arc<AnyThreadSink>>>,
    metrics: Arc<DispatchMetrics>,
    /// Handle back to the owning `Arc`, cloned into scheduled drain jobs
    self_handle: Weak<DispatchCore>,
}

impl DispatchCore {
    fn enqueue(&self, event: EventValue) {
        self.queue.push(event);
        self.metrics.inc_enqueued();
        self.metrics.set_queue_len(self.queue.len());
        trace!(stream = %self.stream_name, "event enqueued");
        self.schedule_flush();
    }

    /// Arm the drain worker unless one is already running
    ///
    /// A failed CAS means a drain is in progress; it re-examines the queue
    /// after releasing the flag, so no wakeup is lost.
    fn schedule_flush(&self) {
        if self
            .drain_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let Some(core) = self.self_handle.upgrade() else {
            // Dispatcher is tearing down; nothing left to deliver to.
            self.drain_running.store(false, Ordering::Release);
            return;
        };
        let dispatched =
            DispatchExecutor::global().execute(Box::new(move || core.drain_queued_events()));
        if !dispatched {
            // The drain will not run; release the flag so a later schedule
            // can pick the backlog up.
            self.drain_running.store(false, Ordering::Release);
            warn!(stream = %self.stream_name, "dispatch executor rejected drain, events stay queued");
        }
    }

    /// Drain worker body, runs on the dispatch thread
    fn drain_queued_events(&self) {
        let _guard = FlushGuard { core: self };
        loop {
            // Records are only removed while a sink is present; with no sink
            // they stay queued and nothing is lost.
            let Some(sink) = self.current_sink() else {
                return;
            };

            let mut batch = self.queue.drain_batch(MAX_BATCH_SIZE);
            self.metrics.set_queue_len(self.queue.len());
            let drained = batch.len() as u64;

            let event = match batch.len() {
                0 => return,
                1 => batch.swap_remove(0),
                _ => {
                    self.metrics.inc_batches();
                    let mut envelope = EventRecord::for_event(EVENT_BATCH);
                    envelope.put_list("events", batch);
                    EventValue::Record(envelope)
                }
            };

            if let Err(e) = sink.add(event) {
                self.metrics.inc_failures();
                warn!(
                    stream = %self.stream_name,
                    sink = %sink.name(),
                    error = %e,
                    "event delivery failed"
                );
            }
            self.metrics.add_delivered(drained);
        }
    }

    fn attach(&self, sink: Arc<AnyThreadSink>) {
        *self
            .sink_slot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn detach(&self) {
        *self
            .sink_slot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn current_sink(&self) -> Option<Arc<AnyThreadSink>> {
        self.sink_slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn has_sink(&self) -> bool {
        self.sink_slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Releases `drain_running` on scope exit and re-arms if work remains
///
/// Runs during unwinding too, so a delivery panic cannot wedge the flag.
struct FlushGuard<'a> {
    core: &'a DispatchCore,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.core.drain_running.store(false, Ordering::Release);
        // The re-check must come after the clear: a producer that pushed
        // while the flag was still set relies on this re-arm.
        if !self.core.queue.is_empty() && self.core.has_sink() {
            self.core.schedule_flush();
        }
    }
}
