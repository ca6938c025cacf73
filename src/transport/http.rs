//! Live HTTP transport posting signed batches to the controller.

use super::{SIGNATURE_HEADER, Transport, TransportError, frame_batch};
use crate::event::Event;
use async_trait::async_trait;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use std::time::Duration;
use tracing::info;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    secret: String,
    compression_threshold: usize,
}

impl HttpTransport {
    pub fn new(
        url: String,
        secret: String,
        compression_threshold: usize,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        info!("Session opened to {url}");

        Ok(Self {
            client,
            url,
            secret,
            compression_threshold,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, batch: Vec<Event>) -> Result<(), TransportError> {
        let frame = frame_batch(&batch, &self.secret, self.compression_threshold)?;

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, frame.signature.as_str());

        if frame.compressed {
            request = request.header(CONTENT_ENCODING, "gzip");
        }

        let response = request.body(frame.body).send().await?;

        if !response.status().is_success() {
            return Err(TransportError::BadStatus(response.status()));
        }

        Ok(())
    }

    async fn close(&self) {
        info!("Session closed");
    }
}
