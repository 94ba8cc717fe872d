//! Validating publish/subscribe broker.
//!
//! Events are checked against a per-type contract before any listener sees
//! them, and listener failures are collected into the [`EmitResult`] instead
//! of propagating to the emitter or to other listeners.

pub mod bus;
pub mod contract;
pub mod error;
pub mod event;
pub mod listener;
pub mod loader;
pub mod result;
pub mod schema;

pub use bus::{Broker, EventBus};
pub use contract::{ContractSet, ContractSetBuilder};
pub use error::{BrokerError, BrokerResult};
pub use event::BrokerEvent;
pub use listener::{Callback, ListenerGuard, ListenerId, Registration};
pub use loader::ContractLoader;
pub use result::{EmitResult, ErrorEntry, ErrorSource};
pub use schema::{Schema, TypedSchema, ValidationError, ValidationIssue, Validator};

pub use brokerkit_core::BrokerConfig;
