//! In-memory transport accumulating batches for inspection in tests.

use super::{Transport, TransportError};
use crate::event::Event;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every sent batch into an observable list. Never fails.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<Vec<Event>>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every batch sent so far.
    pub fn sent(&self) -> Vec<Vec<Event>> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, batch: Vec<Event>) -> Result<(), TransportError> {
        self.sent.lock().push(batch);
        Ok(())
    }

    async fn close(&self) {}
}
