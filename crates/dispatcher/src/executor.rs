//! Process-wide dispatch executor
//!
//! One dedicated thread shared by every dispatcher instance, created on first
//! use and never torn down. Work items are short and non-blocking except for
//! the sink call itself.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;
use std::thread;

use async_channel::{Receiver, Sender};
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

static EXECUTOR: OnceLock<DispatchExecutor> = OnceLock::new();

/// Handle to the shared single-thread executor
pub(crate) struct DispatchExecutor {
    tx: Sender<Job>,
}

impl DispatchExecutor {
    /// The process-wide instance
    pub(crate) fn global() -> &'static DispatchExecutor {
        EXECUTOR.get_or_init(Self::start)
    }

    fn start() -> Self {
        let (tx, rx) = async_channel::unbounded::<Job>();
        let spawned = thread::Builder::new()
            .name("dc-event-dispatch".to_string())
            .spawn(move || run_loop(rx));
        if let Err(e) = spawned {
            // The receiver never started, so every execute() from here on
            // reports rejection.
            error!(error = %e, "failed to start dispatch thread");
        }
        Self { tx }
    }

    /// Run `job` on the dispatch thread
    ///
    /// Returns false when the executor is unavailable and the job will not
    /// run.
    pub(crate) fn execute(&self, job: Job) -> bool {
        self.tx.send_blocking(job).is_ok()
    }
}

fn run_loop(rx: Receiver<Job>) {
    debug!("dispatch thread started");
    while let Ok(job) = rx.recv_blocking() {
        // A panicking job must not take the shared dispatch thread down.
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("dispatch job panicked");
        }
    }
    debug!("dispatch thread stopped");
}
