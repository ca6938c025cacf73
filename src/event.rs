//! Event shapes shared by collectors, the socket ingestor and the
//! dispatcher.

use chrono::Utc;
use serde_json::{Map, Value};

/// A single metrics mapping yielded by a collector.
pub type Metrics = Map<String, Value>;

/// A queued wire object.
///
/// Collector-sourced events carry the `{collector, ts, metrics}` shape;
/// socket-sourced events are any JSON object containing a `collector` key.
pub type Event = Map<String, Value>;

/// Collector-sourced event, stamped at enqueue time.
#[derive(Debug, Clone)]
pub struct MetricEvent {
    pub collector: String,
    pub ts: i64,
    pub metrics: Metrics,
}

impl MetricEvent {
    /// Wrap one collector-yielded mapping with the collector name and the
    /// current epoch-second timestamp.
    pub fn now(collector: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            collector: collector.into(),
            ts: Utc::now().timestamp(),
            metrics,
        }
    }

    pub fn into_event(self) -> Event {
        let mut event = Event::new();
        event.insert("collector".to_string(), Value::String(self.collector));
        event.insert("ts".to_string(), Value::from(self.ts));
        event.insert("metrics".to_string(), Value::Object(self.metrics));
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_event_wire_shape() {
        let mut metrics = Metrics::new();
        metrics.insert("hostname".to_string(), Value::String("web-1".to_string()));

        let event = MetricEvent::now("system", metrics).into_event();

        assert_eq!(event["collector"], "system");
        assert!(event["ts"].as_i64().unwrap() > 0);
        assert_eq!(event["metrics"]["hostname"], "web-1");
    }
}
