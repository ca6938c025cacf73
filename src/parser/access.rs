//! Fixed-grammar access-log formats.
//!
//! Each format is a named-capture regex plus post-processing rules applied
//! to the captured fields. New log formats are additive: declare another
//! `AccessLogFormat` and register it in `parser_by_name`.

use super::LineParser;
use crate::event::Metrics;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

/// Capture-group schema and post-processing rules for one log grammar.
pub struct AccessLogFormat {
    /// Parser identity (`logs.<name>`).
    pub name: &'static str,
    /// Pattern with named capture groups; every named group becomes a field.
    pub pattern: &'static str,
    /// Fields coerced to integers; `-` or other non-digit values become 0.
    pub int_fields: &'static [&'static str],
    /// Field holding a `%d/%b/%Y:%H:%M:%S %z` local timestamp, normalized
    /// to UTC RFC 3339. A malformed timestamp nulls the field, it does not
    /// fail the parse.
    pub timestamp_field: Option<&'static str>,
    /// Field holding the request line, split into method/path/protocol when
    /// it has exactly three tokens.
    pub request_field: Option<&'static str>,
}

/// Nginx "combined" access log. Some logs wrap the whole line in quotes and
/// append extra fields (request id, upstream data); both are tolerated.
pub static NGINX_COMBINED: AccessLogFormat = AccessLogFormat {
    name: "nginx",
    pattern: r#"^"?(?P<remote_addr>\S+) \S+ \S+ \[(?P<time_local>[^\]]+)\] "(?P<request>[^"]*)" (?P<status>\d{3}) (?P<body_bytes_sent>\S+) "(?P<http_referer>[^"]*)" "(?P<http_user_agent>[^"]*)"(?:\s+.*)?"?$"#,
    int_fields: &["status", "body_bytes_sent"],
    timestamp_field: Some("time_local"),
    request_field: Some("request"),
};

/// OpenLiteSpeed access log: vhost-prefixed common log format.
pub static OLS_ACCESS: AccessLogFormat = AccessLogFormat {
    name: "ols",
    pattern: r#"^"?(?P<vhost>\S+) (?P<remote_addr>\S+) \S+ \S+ \[(?P<time_local>[^\]]+)\] "(?P<request>[^"]*)" (?P<status>\d{3}) (?P<body_bytes_sent>\S+)"?$"#,
    int_fields: &["status", "body_bytes_sent"],
    timestamp_field: Some("time_local"),
    request_field: Some("request"),
};

pub struct AccessLogParser {
    format: &'static AccessLogFormat,
    regex: Regex,
}

impl AccessLogParser {
    pub fn new(format: &'static AccessLogFormat) -> Self {
        let regex = Regex::new(format.pattern).expect("static access-log pattern");
        Self { format, regex }
    }
}

impl LineParser for AccessLogParser {
    fn name(&self) -> &'static str {
        self.format.name
    }

    fn parse(&self, line: &str) -> Option<Metrics> {
        let captures = self.regex.captures(line)?;

        let mut fields = Metrics::new();
        for group in self.regex.capture_names().flatten() {
            let value = captures.name(group).map_or("", |m| m.as_str());
            fields.insert(group.to_string(), Value::String(value.to_string()));
        }

        for &key in self.format.int_fields {
            let coerced = fields
                .get(key)
                .and_then(Value::as_str)
                .and_then(|raw| raw.parse::<u64>().ok())
                .unwrap_or(0);
            fields.insert(key.to_string(), Value::from(coerced));
        }

        if let Some(key) = self.format.timestamp_field {
            let normalized = fields
                .get(key)
                .and_then(Value::as_str)
                .and_then(normalize_timestamp);
            fields.insert(key.to_string(), normalized.map_or(Value::Null, Value::String));
        }

        if let Some(key) = self.format.request_field {
            let request = fields
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_default();
            let parts: Vec<&str> = request.split_whitespace().collect();
            if parts.len() == 3 {
                fields.insert("method".to_string(), Value::String(parts[0].to_string()));
                fields.insert("path".to_string(), Value::String(parts[1].to_string()));
                fields.insert("protocol".to_string(), Value::String(parts[2].to_string()));
            }
        }

        Some(fields)
    }
}

fn normalize_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_str(raw, "%d/%b/%Y:%H:%M:%S %z")
        .ok()
        .map(|ts| ts.with_timezone(&Utc).to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NGINX_LINE: &str = r#"203.0.113.7 - - [10/Oct/2023:13:55:36 +0200] "GET /index.html HTTP/1.1" 200 2326 "http://example.com/" "Mozilla/5.0""#;

    fn nginx() -> AccessLogParser {
        AccessLogParser::new(&NGINX_COMBINED)
    }

    fn ols() -> AccessLogParser {
        AccessLogParser::new(&OLS_ACCESS)
    }

    #[test]
    fn nginx_combined_line() {
        let fields = nginx().parse(NGINX_LINE).unwrap();

        assert_eq!(fields["remote_addr"], "203.0.113.7");
        assert_eq!(fields["status"], 200);
        assert_eq!(fields["body_bytes_sent"], 2326);
        assert_eq!(fields["http_referer"], "http://example.com/");
        assert_eq!(fields["http_user_agent"], "Mozilla/5.0");
        assert_eq!(fields["method"], "GET");
        assert_eq!(fields["path"], "/index.html");
        assert_eq!(fields["protocol"], "HTTP/1.1");
        // 13:55:36 +0200 is 11:55:36 UTC
        assert_eq!(fields["time_local"], "2023-10-10T11:55:36+00:00");
    }

    #[test]
    fn nginx_extra_trailing_fields_tolerated() {
        let line = format!("{NGINX_LINE} rid=abc123 upstream=10.0.0.2:8080");
        let fields = nginx().parse(&line).unwrap();
        assert_eq!(fields["status"], 200);
    }

    #[test]
    fn dash_byte_count_coerces_to_zero() {
        let line = r#"203.0.113.7 - - [10/Oct/2023:13:55:36 +0200] "HEAD / HTTP/1.1" 301 - "-" "curl/8.0""#;
        let fields = nginx().parse(line).unwrap();
        assert_eq!(fields["body_bytes_sent"], 0);
    }

    #[test]
    fn malformed_timestamp_nulls_field_only() {
        let line = r#"203.0.113.7 - - [not-a-date] "GET / HTTP/1.1" 200 5 "-" "-""#;
        let fields = nginx().parse(line).unwrap();
        assert!(fields["time_local"].is_null());
        assert_eq!(fields["status"], 200);
    }

    #[test]
    fn malformed_request_line_left_unsplit() {
        let line = r#"203.0.113.7 - - [10/Oct/2023:13:55:36 +0200] "GET" 400 0 "-" "-""#;
        let fields = nginx().parse(line).unwrap();
        assert_eq!(fields["request"], "GET");
        assert!(!fields.contains_key("method"));
    }

    #[test]
    fn garbage_line_is_skipped() {
        assert!(nginx().parse("kernel: oom-killer invoked").is_none());
    }

    #[test]
    fn ols_line_with_vhost() {
        let line = r#"example.com 198.51.100.4 - - [10/Oct/2023:13:55:36 +0000] "POST /api HTTP/1.1" 201 17"#;
        let fields = ols().parse(line).unwrap();

        assert_eq!(fields["vhost"], "example.com");
        assert_eq!(fields["remote_addr"], "198.51.100.4");
        assert_eq!(fields["status"], 201);
        assert_eq!(fields["body_bytes_sent"], 17);
        assert_eq!(fields["method"], "POST");
    }
}
