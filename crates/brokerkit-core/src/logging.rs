use crate::config::LoggingConfig;
use crate::usage::{UsageLayer, UsageLog};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// Installs the global subscriber from config. When usage capture is on, the
/// returned log receives every usage trace line; the filter only governs the
/// formatted output.
pub fn init_logging_with(cfg: &LoggingConfig) -> Option<UsageLog> {
    let filter = match cfg.filter.as_deref() {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    if cfg.capture_usage {
        let log = UsageLog::new();
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_filter(filter))
            .with(UsageLayer::new(log.clone()))
            .try_init();
        Some(log)
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
        None
    }
}
