//! Agent lifecycle: the collector polling loop, the socket listener and the
//! dispatcher flush loop sharing one dispatcher/transport pair.

use super::config::{Config, TransportKind};
use crate::collector::{self, Collector, CollectorError};
use crate::dispatch::Dispatcher;
use crate::event::MetricEvent;
use crate::ingest::{IngestError, SocketIngestor};
use crate::transport::{DebugTransport, HttpTransport, Transport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),
}

pub struct Agent {
    collectors: Vec<Box<dyn Collector>>,
    dispatcher: Arc<Dispatcher>,
    transport: Arc<dyn Transport>,
    socket: String,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl Agent {
    /// Build the agent from configuration: collectors from the registration
    /// table, the configured transport, and a dispatcher wired to it.
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let transport: Arc<dyn Transport> = match config.transport {
            TransportKind::Http => {
                let url = config.controller_url.clone().ok_or_else(|| {
                    TransportError::InvalidConfig("controller URL is required".to_string())
                })?;
                Arc::new(HttpTransport::new(
                    url,
                    config.secret().to_string(),
                    config.compression_threshold,
                )?)
            }
            TransportKind::Debug => Arc::new(DebugTransport::new(
                config.secret().to_string(),
                config.compression_threshold,
            )),
        };

        Self::with_transport(config, transport)
    }

    /// Build the agent around an externally constructed transport.
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, AgentError> {
        let collectors = collector::build_collectors(&config.collectors)?;
        let dispatcher = Arc::new(Dispatcher::new(transport.clone(), config.poll_interval));

        Ok(Self {
            collectors,
            dispatcher,
            transport,
            socket: config.socket.clone(),
            poll_interval: config.poll_interval,
            cancel: CancellationToken::new(),
        })
    }

    /// Token cancelling the agent's loops; `run` returns once it fires.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until the cancellation token fires, then drain and close.
    ///
    /// Shutdown order: stop accepting, cancel the polling and flush loops,
    /// wait for all three tasks, final dispatcher flush, close the
    /// transport.
    pub async fn run(mut self) -> Result<(), AgentError> {
        info!("Running");

        let ingestor = SocketIngestor::bind(&self.socket, self.dispatcher.clone())?;

        let dispatcher = self.dispatcher.clone();
        let dispatcher_cancel = self.cancel.clone();
        let dispatcher_task =
            tokio::spawn(async move { dispatcher.run(dispatcher_cancel).await });

        let server_task = tokio::spawn(ingestor.run(self.cancel.clone()));

        let collectors = std::mem::take(&mut self.collectors);
        let poll_task = tokio::spawn(poll_loop(
            collectors,
            self.dispatcher.clone(),
            self.poll_interval,
            self.cancel.clone(),
        ));

        self.cancel.cancelled().await;

        info!("Stopping tasks");

        for (name, task) in [
            ("server", server_task),
            ("collector", poll_task),
            ("dispatcher", dispatcher_task),
        ] {
            if let Err(e) = task.await {
                warn!("{name} task failed: {e}");
            }
        }

        self.dispatcher.close().await;
        self.transport.close().await;

        info!("Stopping tasks complete");
        Ok(())
    }
}

/// Drive every collector each interval and enqueue what they yield.
///
/// A failing collector is logged and never blocks the remaining collectors
/// or future iterations. Collectors run inline on this task, so a hung
/// collector stalls the loop until it returns.
async fn poll_loop(
    mut collectors: Vec<Box<dyn Collector>>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        for collector in &mut collectors {
            let name = collector.name();
            match collector.collect() {
                Ok(batches) => {
                    let count = batches.len();
                    for metrics in batches {
                        let event = MetricEvent::now(name.clone(), metrics).into_event();
                        dispatcher.enqueue(event, false).await;
                    }
                    info!("{name}: queued {count} events");
                }
                Err(e) => warn!("{name}: collect failed: {e}"),
            }
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    info!("Collector loop stopped");
}
