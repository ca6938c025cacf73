//! Local ingestion endpoint.
//!
//! One connection carries one JSON document (object or array of objects),
//! read in a single bounded read and never answered. Payloads larger than
//! one read are truncated; that is a documented limitation of the protocol,
//! not a stream to be reassembled.

use crate::dispatch::Dispatcher;
use crate::event::Event;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on a single ingested payload.
pub const MAX_PAYLOAD: usize = 4096;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Bind error: {0}")]
    Bind(std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct SocketIngestor {
    listener: UnixListener,
    dispatcher: Arc<Dispatcher>,
}

impl SocketIngestor {
    /// Bind the ingestion endpoint. A name starting with `@` binds into the
    /// Linux abstract namespace; otherwise a stale filesystem node is
    /// removed before binding.
    pub fn bind(name: &str, dispatcher: Arc<Dispatcher>) -> Result<Self, IngestError> {
        let listener = bind_listener(name)?;
        debug!("Created socket: {name}");

        Ok(Self {
            listener,
            dispatcher,
        })
    }

    /// Accept connections until cancelled. Each connection is handled on its
    /// own task, with no cross-connection ordering guarantee.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let dispatcher = self.dispatcher.clone();
                        tokio::spawn(handle_connection(stream, dispatcher));
                    }
                    Err(e) => warn!("Accept failed: {e}"),
                },
            }
        }

        info!("Socket listener stopped");
    }
}

fn bind_listener(name: &str) -> Result<UnixListener, IngestError> {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    if let Some(abstract_name) = name.strip_prefix('@') {
        use std::os::linux::net::SocketAddrExt;

        let addr = std::os::unix::net::SocketAddr::from_abstract_name(abstract_name)
            .map_err(IngestError::Bind)?;
        let listener =
            std::os::unix::net::UnixListener::bind_addr(&addr).map_err(IngestError::Bind)?;
        listener.set_nonblocking(true).map_err(IngestError::Bind)?;
        return UnixListener::from_std(listener).map_err(IngestError::Bind);
    }

    let path = Path::new(name);
    if path.exists() {
        std::fs::remove_file(path).map_err(IngestError::Bind)?;
    }
    UnixListener::bind(path).map_err(IngestError::Bind)
}

async fn handle_connection(mut stream: UnixStream, dispatcher: Arc<Dispatcher>) {
    let mut buf = vec![0u8; MAX_PAYLOAD];
    let n = match stream.read(&mut buf).await {
        Ok(n) => n,
        Err(e) => {
            warn!("Socket read failed: {e}");
            return;
        }
    };

    if n == 0 {
        return;
    }

    match decode_events(&buf[..n]) {
        Ok(events) => {
            for event in events {
                dispatcher.enqueue(event, false).await;
            }
            info!("Socket payload accepted");
        }
        Err(e) => warn!("Rejected socket payload: {e}"),
    }

    // No response is sent; the connection closes on drop.
}

/// Decode and validate one ingested document.
///
/// A bare object is normalized to a one-element array. Elements that are
/// not objects, or that lack a `collector` key, are skipped with a warning;
/// the remaining valid elements are still accepted.
pub fn decode_events(data: &[u8]) -> Result<Vec<Event>, IngestError> {
    let payload: Value = serde_json::from_slice(data)?;

    let items = match payload {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut events = Vec::new();
    for item in items {
        match item {
            Value::Object(event) => {
                if event.contains_key("collector") {
                    events.push(event);
                } else {
                    warn!("Missing 'collector' field");
                }
            }
            _ => warn!("Non-object JSON received"),
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_rejected() {
        assert!(decode_events(b"{not json").is_err());
        assert!(decode_events(b"").is_err());
    }

    #[test]
    fn bare_object_normalized_to_one_event() {
        let events = decode_events(br#"{"collector":"ext","value":1}"#).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["collector"], "ext");
    }

    #[test]
    fn object_without_collector_yields_nothing() {
        let events = decode_events(br#"{"site":"x"}"#).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn partial_validity_keeps_valid_elements_in_order() {
        let events =
            decode_events(br#"[{"collector":"a"},{"bad":1},42,{"collector":"b"}]"#).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["collector"], "a");
        assert_eq!(events[1]["collector"], "b");
    }

    #[test]
    fn non_object_document_yields_nothing() {
        assert!(decode_events(b"42").unwrap().is_empty());
        assert!(decode_events(br#""text""#).unwrap().is_empty());
    }
}
