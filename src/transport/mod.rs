//! Batch transports.
//!
//! Every transport frames a batch the same way (canonical JSON, HMAC
//! signature, conditional gzip) and differs only in how it delivers the
//! result. Transports never retry internally; failures surface to the
//! dispatcher, which drops the batch.

pub mod debug;
pub mod frame;
pub mod http;
pub mod memory;

pub use debug::DebugTransport;
pub use frame::{Frame, frame_batch};
pub use http::HttpTransport;
pub use memory::MemoryTransport;

use crate::event::Event;
use async_trait::async_trait;
use thiserror::Error;

/// Header carrying the hex HMAC-SHA256 of the raw JSON body.
pub const SIGNATURE_HEADER: &str = "x-agent-signature";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid transport config: {0}")]
    InvalidConfig(String),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Compression error: {0}")]
    Compress(#[from] std::io::Error),
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Bad response: {0}")]
    BadStatus(reqwest::StatusCode),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, batch: Vec<Event>) -> Result<(), TransportError>;

    async fn close(&self);
}
