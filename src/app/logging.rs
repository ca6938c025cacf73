//! Tracing setup.

use super::config::Config;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. `RUST_LOG` wins when set; otherwise the
/// configured level applies, with the HTTP stack quieted.
pub fn init(config: &Config) {
    let level: tracing::Level = config.log_level.into();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},hyper=warn,reqwest=warn")));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
