//! Owner of every adapter in the process.
//!
//! The [`Scheduler`] starts each adapter on its own timer and routes all
//! batches into one [`BatchSink`]. Adapters share nothing: there is no
//! global polling order, and a failing or disabled adapter has no effect
//! on the others.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;
use worldpulse_types::StatusRecord;

use crate::adapter::{Adapter, AdapterHealth, BatchSink};
use crate::source::{AdapterSettings, EventSource};

/// Type-erased adapter handle held by the scheduler.
pub trait ManagedAdapter: Send + Sync {
    /// Start the adapter's timer; `None` if it did not start.
    fn start_polling(self: Arc<Self>, sink: Arc<dyn BatchSink>) -> Option<JoinHandle<()>>;

    /// Cancel the adapter's timer.
    fn stop_polling(&self);

    /// The adapter's shared health.
    fn health_handle(&self) -> Arc<AdapterHealth>;
}

impl<S: EventSource> ManagedAdapter for Adapter<S> {
    fn start_polling(self: Arc<Self>, sink: Arc<dyn BatchSink>) -> Option<JoinHandle<()>> {
        self.start(sink)
    }

    fn stop_polling(&self) {
        self.stop();
    }

    fn health_handle(&self) -> Arc<AdapterHealth> {
        Arc::clone(self.health())
    }
}

/// Runs N independent adapters against one sink.
pub struct Scheduler {
    sink: Arc<dyn BatchSink>,
    adapters: Vec<Arc<dyn ManagedAdapter>>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Create an empty scheduler delivering to `sink`.
    pub fn new(sink: Arc<dyn BatchSink>) -> Self {
        Self {
            sink,
            adapters: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Wrap `source` in an adapter with `settings` and register it.
    ///
    /// The returned handle can be used for manual polls.
    pub fn add<S: EventSource>(&mut self, source: S, settings: AdapterSettings) -> Arc<Adapter<S>> {
        let adapter = Arc::new(Adapter::with_settings(source, settings));
        let managed: Arc<dyn ManagedAdapter> = Arc::clone(&adapter) as Arc<dyn ManagedAdapter>;
        self.adapters.push(managed);
        adapter
    }

    /// Start every registered adapter. Returns how many started.
    pub fn start_all(&mut self) -> usize {
        let mut started: usize = 0;
        for adapter in &self.adapters {
            if let Some(handle) = Arc::clone(adapter).start_polling(Arc::clone(&self.sink)) {
                self.handles.push(handle);
                started = started.saturating_add(1);
            }
        }
        info!(started, total = self.adapters.len(), "Adapters started");
        started
    }

    /// Cancel every adapter's timer. In-flight polls still complete.
    pub fn stop_all(&self) {
        for adapter in &self.adapters {
            adapter.stop_polling();
        }
        info!(total = self.adapters.len(), "Adapters stopped");
    }

    /// Stop all adapters and wait for their timer tasks to exit.
    pub async fn shutdown(self) {
        self.stop_all();
        for handle in self.handles {
            // A timer task that panicked has nothing left to clean up.
            let _ = handle.await;
        }
    }

    /// Health handles of every adapter, in registration order.
    pub fn health(&self) -> Vec<Arc<AdapterHealth>> {
        self.adapters.iter().map(|a| a.health_handle()).collect()
    }

    /// Status records of every adapter, in registration order.
    pub fn statuses(&self) -> Vec<StatusRecord> {
        self.adapters.iter().map(|a| a.health_handle().status()).collect()
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapters are registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
