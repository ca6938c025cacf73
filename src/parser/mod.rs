//! Line parsers applied by the log tailer.
//!
//! A parser turns one raw log line into a metrics mapping. Returning `None`
//! means "skip this line", not an error.

pub mod access;

pub use access::{AccessLogFormat, AccessLogParser, NGINX_COMBINED, OLS_ACCESS};

use crate::event::Metrics;
use serde_json::Value;

pub trait LineParser: Send {
    /// Short identity used to disambiguate collector naming
    /// (`logs.<parser-name>`).
    fn name(&self) -> &'static str;

    fn parse(&self, line: &str) -> Option<Metrics>;
}

/// Passes every line through untouched as `{"raw": line}`.
pub struct RawParser;

impl LineParser for RawParser {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn parse(&self, line: &str) -> Option<Metrics> {
        let mut fields = Metrics::new();
        fields.insert("raw".to_string(), Value::String(line.to_string()));
        Some(fields)
    }
}

/// Look up a parser by its configured name.
pub fn parser_by_name(name: &str) -> Option<Box<dyn LineParser>> {
    match name {
        "raw" => Some(Box::new(RawParser)),
        "nginx" => Some(Box::new(AccessLogParser::new(&NGINX_COMBINED))),
        "ols" => Some(Box::new(AccessLogParser::new(&OLS_ACCESS))),
        _ => None,
    }
}
