pub mod change;
pub mod config;
pub mod debounce;
pub mod error;
pub mod logging;
pub mod usage;

pub use change::ChangeTracker;
pub use config::{BrokerConfig, CoreConfig, DebounceConfig, LoggingConfig};
pub use debounce::Debouncer;
pub use error::{format_error_chain, CoreError, CoreResult};
pub use logging::{init_logging, init_logging_with};
pub use usage::{UsageLayer, UsageLine, UsageLog, USAGE_TARGET};
