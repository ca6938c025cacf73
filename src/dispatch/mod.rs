//! Batching dispatcher decoupling producers from network delivery.

use crate::event::Event;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    interval: Duration,
    queue: Mutex<VecDeque<Event>>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, interval: Duration) -> Self {
        Self {
            transport,
            interval,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Append an event to the queue; with `flush` set, flush immediately
    /// after appending.
    pub async fn enqueue(&self, event: Event, flush: bool) {
        self.queue.lock().push_back(event);

        if flush {
            self.flush().await;
        }
    }

    /// Periodically flush queued events until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Running with {:?} interval", self.interval);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => self.flush().await,
            }
        }

        info!("Stopped");
    }

    /// Atomically drain the queue and hand the batch to the transport.
    ///
    /// Events enqueued while the batch is in flight belong to the next
    /// flush. A delivery failure drops the batch: at-most-once, no retry,
    /// no requeue.
    pub async fn flush(&self) {
        let batch: Vec<Event> = {
            let mut queue = self.queue.lock();
            queue.drain(..).collect()
        };

        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        match self.transport.send(batch).await {
            Ok(()) => info!("Flushed batch ({count} events)"),
            Err(e) => warn!("Flush failed: {e}"),
        }
    }

    /// Final flush so nothing queued before a clean shutdown is lost.
    pub async fn close(&self) {
        self.flush().await;
    }

    /// Number of events waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}
