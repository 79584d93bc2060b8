//! Broadcast fan-out of ticks to subscriber queues.
//!
//! The bus delivers each [`TickEvent`] to every subscriber with a
//! non-blocking enqueue: a slow consumer fills its own queue and starts
//! dropping ticks, but never stalls the publisher or its peers. The
//! subscriber set sits behind a read/write lock so publishes share a
//! read lock while subscribe/close take it exclusively.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

use crate::event::TickEvent;
use crate::metrics::PipelineMetrics;

/// Bounded capacity of each subscriber queue.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 100;

/// Broadcasts ticks to N independent subscriber queues.
#[derive(Debug)]
pub struct EventBus {
    subscribers: RwLock<Vec<mpsc::Sender<Arc<TickEvent>>>>,
    metrics: Arc<PipelineMetrics>,
}

impl EventBus {
    pub fn new(metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            metrics,
        }
    }

    /// The observability port shared with subscribers.
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Register a new subscriber and return its queue.
    ///
    /// Each subscriber gets its own bounded FIFO; delivery within it is
    /// in publish order. The receiver observing `None` means the bus was
    /// closed.
    pub fn subscribe(&self) -> mpsc::Receiver<Arc<TickEvent>> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.subscribers.write().push(tx);
        rx
    }

    /// Wrap raw ingest bytes into a tick and broadcast it.
    ///
    /// This is the external ingest boundary: the payload is an
    /// unvalidated JSON document passed through as opaque bytes.
    pub fn ingest(&self, raw: Vec<u8>) {
        self.publish(Arc::new(TickEvent::new(raw)));
    }

    /// Broadcast one tick to every current subscriber.
    ///
    /// Never blocks: each subscriber gets one `try_send` attempt. A full
    /// queue increments the dropped counter and is logged; the remaining
    /// subscribers still receive the tick. Publishing with zero
    /// subscribers (including after [`close`](Self::close)) is a no-op.
    pub fn publish(&self, event: Arc<TickEvent>) {
        let subscribers = self.subscribers.read();
        for subscriber in subscribers.iter() {
            match subscriber.try_send(event.clone()) {
                Ok(()) => self.metrics.record_delivered(),
                Err(TrySendError::Full(_)) => {
                    warn!("tick dropped: subscriber queue full");
                    self.metrics.record_dropped();
                }
                // Receiver already gone; acceptable loss during shutdown.
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Close every subscriber queue and clear the set.
    ///
    /// Dropping the senders closes the channels, so consumer loops see
    /// end-of-stream and exit. Publish after close is a no-op.
    pub fn close(&self) {
        let mut subscribers = self.subscribers.write();
        let count = subscribers.len();
        subscribers.clear();
        info!(subscribers = count, "event bus closed");
    }

    /// Number of registered subscriber queues.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
