use crate::schema::ValidationError;
use thiserror::Error;

pub type BrokerResult<T> = Result<T, BrokerError>;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("payload for `{event_type}` failed validation")]
    Validation {
        event_type: String,
        #[source]
        source: ValidationError,
    },
    #[error("no contract for event type `{0}`")]
    UnknownEventType(String),
    #[error("listener in `{component}` failed")]
    Listener {
        component: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("listener in `{component}` panicked: {message}")]
    ListenerPanicked { component: String, message: String },
}
