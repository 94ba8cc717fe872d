use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub broker: BrokerConfig,
    pub logging: LoggingConfig,
    pub debounce: DebounceConfig,
}

/// Options fixed when a broker is constructed.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct BrokerConfig {
    /// Trace register/emit/unregister calls on the `brokerkit::usage` target.
    pub log_usage: bool,
}

impl BrokerConfig {
    pub fn with_usage_logging() -> Self {
        Self { log_usage: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` or `info` when absent.
    pub filter: Option<String>,
    pub capture_usage: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebounceConfig {
    pub delay_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self { delay_ms: 300 }
    }
}

impl CoreConfig {
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> CoreResult<Self> {
        let cfg: CoreConfig = serde_json::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.debounce.delay_ms == 0 {
            return Err(CoreError::Config(
                "debounce.delay_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
