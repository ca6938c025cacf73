//! Wire framing shared by every transport.

use super::TransportError;
use crate::event::Event;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::io::{Read, Write};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// A batch framed for the wire.
#[derive(Debug, Clone)]
pub struct Frame {
    pub body: Bytes,
    pub signature: String,
    pub compressed: bool,
}

/// Canonicalize, sign and conditionally compress a batch.
///
/// The batch serializes as a compact JSON array, giving a deterministic
/// byte sequence. The signature covers the raw pre-compression bytes so the
/// receiver can verify it after undoing the content encoding. A body of
/// exactly `threshold` bytes is sent uncompressed.
pub fn frame_batch(
    batch: &[Event],
    secret: &str,
    threshold: usize,
) -> Result<Frame, TransportError> {
    let raw = serde_json::to_vec(batch)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("any key length works");
    mac.update(&raw);
    let signature = hex::encode(mac.finalize().into_bytes());

    if raw.len() > threshold {
        let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len()), Compression::default());
        encoder.write_all(&raw)?;
        let body = encoder.finish()?;
        debug!(
            "size: {} compressed: {} ratio: {:.2}",
            raw.len(),
            body.len(),
            body.len() as f64 / raw.len() as f64
        );
        Ok(Frame {
            body: Bytes::from(body),
            signature,
            compressed: true,
        })
    } else {
        debug!("size: {}", raw.len());
        Ok(Frame {
            body: Bytes::from(raw),
            signature,
            compressed: false,
        })
    }
}

/// Undo the gzip content encoding of a framed body.
pub fn gunzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = flate2::read::GzDecoder::new(body);
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;
    Ok(raw)
}
