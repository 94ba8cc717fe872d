use crate::error::{BrokerError, BrokerResult};
use crate::listener::ListenerId;
use brokerkit_core::format_error_chain;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorSource {
    SchemaValidation,
    Listener,
}

#[derive(Debug)]
pub struct ErrorEntry {
    pub source: ErrorSource,
    /// Set for listener errors.
    pub listener: Option<ListenerId>,
    pub error: BrokerError,
}

/// Outcome of one emission. Errors never escape `emit`; they land here.
#[derive(Debug)]
pub struct EmitResult {
    pub success: bool,
    pub errors: Vec<ErrorEntry>,
    /// Listeners the event was dispatched to, failed ones included.
    pub delivered: usize,
}

impl EmitResult {
    pub(crate) fn rejected(error: BrokerError) -> Self {
        Self {
            success: false,
            errors: vec![ErrorEntry {
                source: ErrorSource::SchemaValidation,
                listener: None,
                error,
            }],
            delivered: 0,
        }
    }

    pub(crate) fn dispatched(delivered: usize, errors: Vec<ErrorEntry>) -> Self {
        Self {
            success: errors.is_empty(),
            errors,
            delivered,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn schema_error(&self) -> Option<&BrokerError> {
        self.errors
            .iter()
            .find(|e| e.source == ErrorSource::SchemaValidation)
            .map(|e| &e.error)
    }

    pub fn listener_errors(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.errors
            .iter()
            .filter(|e| e.source == ErrorSource::Listener)
    }

    /// One line per error, each with its cause chain.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format_error_chain(&e.error))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `Ok(delivered)` on success, otherwise the first recorded error.
    pub fn into_result(self) -> BrokerResult<usize> {
        match self.errors.into_iter().next() {
            None => Ok(self.delivered),
            Some(entry) => Err(entry.error),
        }
    }
}
