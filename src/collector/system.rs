//! Hostname collector, autoloaded on every agent.

use super::{Collector, CollectorError};
use crate::event::Metrics;
use serde_json::Value;

pub struct SystemCollector;

pub fn build(_config: &toml::Table) -> Result<Box<dyn Collector>, CollectorError> {
    Ok(Box::new(SystemCollector))
}

impl Collector for SystemCollector {
    fn name(&self) -> String {
        "system".to_string()
    }

    fn collect(&mut self) -> Result<Vec<Metrics>, CollectorError> {
        let hostname = hostname::get()?.to_string_lossy().into_owned();

        let mut metrics = Metrics::new();
        metrics.insert("hostname".to_string(), Value::String(hostname));
        Ok(vec![metrics])
    }
}
