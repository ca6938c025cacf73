//! Transport that logs what it would send instead of delivering it.

use super::frame::gunzip;
use super::{Transport, TransportError, frame_batch};
use crate::event::Event;
use async_trait::async_trait;
use tracing::{info, warn};

/// Frames batches like the live transport but only logs the payload.
/// Never fails.
pub struct DebugTransport {
    secret: String,
    compression_threshold: usize,
}

impl DebugTransport {
    pub fn new(secret: String, compression_threshold: usize) -> Self {
        Self {
            secret,
            compression_threshold,
        }
    }
}

#[async_trait]
impl Transport for DebugTransport {
    async fn send(&self, batch: Vec<Event>) -> Result<(), TransportError> {
        let frame = match frame_batch(&batch, &self.secret, self.compression_threshold) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Framing failed: {e}");
                return Ok(());
            }
        };

        let body = if frame.compressed {
            match gunzip(&frame.body) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Decompression failed: {e}");
                    return Ok(());
                }
            }
        } else {
            frame.body.to_vec()
        };

        info!("Would send: {}", String::from_utf8_lossy(&body));
        Ok(())
    }

    async fn close(&self) {
        info!("Closed");
    }
}
