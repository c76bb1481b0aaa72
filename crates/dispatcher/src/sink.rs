//! Sink adapters
//!
//! [`AnyThreadSink`] makes an application sink callable from any thread by
//! marshalling every delivery onto the sink's required consumer thread.

use std::sync::Arc;

use contracts::{ChannelError, EventSink, EventValue, TaskRunner};
use tracing::warn;

use crate::metrics::DispatchMetrics;

/// Wraps a sink so calls from any thread land on its delivery thread
///
/// `add` hands the value to the runner and returns; a failure reported by the
/// inner sink surfaces on the delivery thread, where it is logged and counted
/// against the owning dispatcher's metrics.
pub struct AnyThreadSink {
    inner: Arc<dyn EventSink>,
    runner: Arc<dyn TaskRunner>,
    metrics: Arc<DispatchMetrics>,
    name: String,
}

impl AnyThreadSink {
    /// Wrap `inner` so it can be called from any thread
    pub fn new(
        inner: Arc<dyn EventSink>,
        runner: Arc<dyn TaskRunner>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        let name = inner.name().to_string();
        Self {
            inner,
            runner,
            metrics,
            name,
        }
    }
}

impl EventSink for AnyThreadSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, event: EventValue) -> Result<(), ChannelError> {
        let inner = Arc::clone(&self.inner);
        let metrics = Arc::clone(&self.metrics);
        let name = self.name.clone();
        self.runner.post(Box::new(move || {
            if let Err(e) = inner.add(event) {
                metrics.inc_failures();
                warn!(sink = %name, error = %e, "sink delivery failed");
            }
        }));
        Ok(())
    }
}

/// Runs posted tasks directly on the calling thread
///
/// Stand-in consumer thread for tests and demos; platform embedders supply a
/// runner that posts onto their UI thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineRunner;

impl TaskRunner for InlineRunner {
    fn post(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}
