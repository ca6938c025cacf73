use crate::collector::CollectorEntry;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// How batches leave the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportKind {
    /// POST signed batches to the controller URL.
    #[default]
    Http,
    /// Log what would be sent instead of delivering it.
    Debug,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Collector poll interval in seconds
    #[arg(long, env = "BEACON_POLL_INTERVAL_SECS", default_value = "30")]
    pub poll_interval_secs: u64,

    /// Local ingestion socket: a filesystem path, or @name for the Linux
    /// abstract namespace
    #[arg(long, env = "BEACON_SOCKET", default_value = "/tmp/beacon-agent.sock")]
    pub socket: String,

    /// Controller endpoint URL receiving signed batches
    #[arg(long, env = "BEACON_CONTROLLER_URL")]
    pub controller_url: Option<String>,

    /// Shared secret for batch signing
    #[arg(long, env = "BEACON_SECRET")]
    pub secret: Option<String>,

    /// Compress request bodies larger than this many bytes
    #[arg(long, env = "BEACON_COMPRESSION_THRESHOLD", default_value = "1024")]
    pub compression_threshold: usize,

    /// Batch transport
    #[arg(long, env = "BEACON_TRANSPORT", value_enum, default_value = "http")]
    pub transport: TransportKind,

    /// TOML file with [[collectors]] entries
    #[arg(long, env = "BEACON_COLLECTORS_FILE")]
    pub collectors_file: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "BEACON_LOG_LEVEL", value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Derived fields (not CLI arguments)
    #[arg(skip)]
    pub poll_interval: Duration,

    #[arg(skip)]
    pub collectors: Vec<CollectorEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            socket: "/tmp/beacon-agent.sock".to_string(),
            controller_url: None,
            secret: None,
            compression_threshold: 1024,
            transport: TransportKind::Http,
            collectors_file: None,
            log_level: LogLevel::Info,
            poll_interval: Duration::from_secs(30),
            collectors: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CollectorsFile {
    #[serde(default)]
    collectors: Vec<CollectorEntry>,
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.poll_interval = Duration::from_secs(self.poll_interval_secs);

        if let Some(path) = &self.collectors_file {
            let contents = std::fs::read_to_string(path)?;
            let file: CollectorsFile = toml::from_str(&contents)?;
            self.collectors = file.collectors;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "poll interval must be positive".to_string(),
            ));
        }

        if self.socket.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "socket name must not be empty".to_string(),
            ));
        }

        if self.transport == TransportKind::Http {
            let url = self.controller_url.as_deref().ok_or_else(|| {
                ConfigError::InvalidConfig("http transport requires --controller-url".to_string())
            })?;
            Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{url}: {e}")))?;

            if self.secret.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::InvalidConfig(
                    "http transport requires --secret".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Signing secret; empty when none is configured (debug transport only).
    pub fn secret(&self) -> &str {
        self.secret.as_deref().unwrap_or("")
    }
}
