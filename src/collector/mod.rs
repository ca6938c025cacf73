//! Collector capability and the startup registration table.

pub mod cursor;
pub mod log;
pub mod system;

pub use cursor::{Cursor, CursorStore};
pub use log::LogTailer;
pub use system::SystemCollector;

use crate::event::Metrics;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Unknown collector: {0}")]
    UnknownKind(String),
    #[error("Invalid collector config: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pluggable source of metric or log data.
///
/// `collect` returns a finite batch per call and is restartable: calling it
/// again with no new data yields nothing. Collectors run inline on the
/// polling task, so a collector that blocks stalls the whole polling loop.
pub trait Collector: Send {
    fn name(&self) -> String;

    fn collect(&mut self) -> Result<Vec<Metrics>, CollectorError>;
}

/// One configured collector instance: a registered type identifier plus its
/// type-specific settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: toml::Table,
}

/// One row of the registration table: a type identifier, its factory, and
/// whether an instance is created even without an explicit config entry.
pub struct Registration {
    pub kind: &'static str,
    pub autoload: bool,
    pub build: fn(&toml::Table) -> Result<Box<dyn Collector>, CollectorError>,
}

/// Registration table, built once and consulted at startup only.
pub const REGISTRY: &[Registration] = &[
    Registration {
        kind: "system",
        autoload: true,
        build: system::build,
    },
    Registration {
        kind: "logs",
        autoload: false,
        build: log::build,
    },
];

/// Instantiate autoloaded collectors plus the configured entries, in
/// configured order. An unknown type is startup-fatal.
pub fn build_collectors(
    entries: &[CollectorEntry],
) -> Result<Vec<Box<dyn Collector>>, CollectorError> {
    let mut collectors = Vec::new();

    for registration in REGISTRY {
        if registration.autoload {
            collectors.push((registration.build)(&toml::Table::new())?);
        }
    }

    for entry in entries {
        let registration = REGISTRY
            .iter()
            .find(|registration| registration.kind == entry.kind)
            .ok_or_else(|| CollectorError::UnknownKind(entry.kind.clone()))?;
        collectors.push((registration.build)(&entry.config)?);
    }

    Ok(collectors)
}
