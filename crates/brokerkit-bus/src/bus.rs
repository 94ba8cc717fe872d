use crate::contract::ContractSet;
use crate::error::{BrokerError, BrokerResult};
use crate::event::BrokerEvent;
use crate::listener::{Callback, ListenerGuard, ListenerId, Registration};
use crate::result::{EmitResult, ErrorEntry, ErrorSource};
use crate::schema::ValidationError;
use brokerkit_core::{BrokerConfig, USAGE_TARGET};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// The in-process publish/subscribe API.
pub trait EventBus: Send + Sync {
    fn register(&self, component_name: &str, event_type: &str, callback: Callback) -> ListenerId;
    fn emit(&self, from_component: &str, event: BrokerEvent) -> EmitResult;
    fn unregister(&self, id: ListenerId);
}

/// Validating event broker.
///
/// Cloning is cheap and every clone shares the same registry. Listeners run
/// synchronously on the emitting thread, outside the registry lock, so a
/// callback may register, unregister or emit without deadlocking. Each
/// emission dispatches to the listeners registered when it started; changes
/// made during dispatch apply from the next emission on.
#[derive(Clone)]
pub struct Broker {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    contracts: ContractSet,
    config: BrokerConfig,
    next_id: AtomicU64,
    registry: Mutex<BTreeMap<ListenerId, Registration>>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, BTreeMap<ListenerId, Registration>> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn insert(&self, component_name: &str, event_type: &str, callback: Callback) -> ListenerId {
        if !self.contracts.contains(event_type) {
            tracing::warn!(
                component = component_name,
                event_type,
                "listener registered for an event type without a contract; it will never fire"
            );
        }

        let id = ListenerId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry().insert(
            id,
            Registration {
                id,
                component_name: component_name.to_string(),
                event_type: event_type.to_string(),
                callback,
            },
        );

        if self.config.log_usage {
            tracing::info!(
                target: USAGE_TARGET,
                component = component_name,
                event_type,
                listener = %id,
                "listener registered"
            );
        }
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) {
        let removed = self.registry().remove(&id);
        if let (Some(reg), true) = (removed, self.config.log_usage) {
            tracing::info!(
                target: USAGE_TARGET,
                component = %reg.component_name,
                event_type = %reg.event_type,
                listener = %id,
                "listener unregistered"
            );
        }
    }

    /// Matching registrations in registration order, copied out so the lock
    /// is released before any callback runs.
    fn snapshot(&self, event_type: &str) -> Vec<Registration> {
        self.registry()
            .values()
            .filter(|reg| reg.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl Broker {
    pub fn new(contracts: ContractSet, config: BrokerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                contracts,
                config,
                next_id: AtomicU64::new(1),
                registry: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn contracts(&self) -> &ContractSet {
        &self.shared.contracts
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.shared.config
    }

    /// Registers `callback` for `event_type`. Never fails: a type with no
    /// contract is accepted, logged, and simply never delivered.
    pub fn register<F>(&self, component_name: &str, event_type: &str, callback: F) -> ListenerId
    where
        F: Fn(&BrokerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.shared.insert(component_name, event_type, Arc::new(callback))
    }

    /// Like [`Broker::register`], but refuses event types outside the contract set.
    pub fn try_register<F>(
        &self,
        component_name: &str,
        event_type: &str,
        callback: F,
    ) -> BrokerResult<ListenerId>
    where
        F: Fn(&BrokerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if !self.shared.contracts.contains(event_type) {
            return Err(BrokerError::UnknownEventType(event_type.to_string()));
        }
        Ok(self.register(component_name, event_type, callback))
    }

    /// Registers for the lifetime of the returned guard.
    pub fn subscribe<F>(&self, component_name: &str, event_type: &str, callback: F) -> ListenerGuard
    where
        F: Fn(&BrokerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.register(component_name, event_type, callback);
        ListenerGuard::new(id, &self.shared)
    }

    /// Registers a callback that receives the payload decoded as `T`. A
    /// payload that does not decode is reported as a listener error.
    pub fn register_typed<T, F>(&self, component_name: &str, event_type: &str, callback: F) -> ListenerId
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(component_name, event_type, move |event: &BrokerEvent| {
            let payload: T = event.decode()?;
            callback(payload)
        })
    }

    pub fn emit(&self, from_component: &str, event: BrokerEvent) -> EmitResult {
        let BrokerEvent { event_type, data } = event;

        let data = match self.shared.contracts.validate(&event_type, &data) {
            Ok(data) => data,
            Err(error) => {
                let result = EmitResult::rejected(error);
                self.trace_emit(from_component, &event_type, &result);
                return result;
            }
        };

        let listeners = self.shared.snapshot(&event_type);
        let event = BrokerEvent { event_type, data };
        let mut errors = Vec::new();

        for reg in &listeners {
            if let Some(error) = invoke(reg, &event) {
                errors.push(ErrorEntry {
                    source: ErrorSource::Listener,
                    listener: Some(reg.id),
                    error,
                });
            }
        }

        let result = EmitResult::dispatched(listeners.len(), errors);
        self.trace_emit(from_component, &event.event_type, &result);
        result
    }

    /// Serializes `payload` and emits it. A payload that cannot be represented
    /// as JSON is rejected like any other invalid payload.
    pub fn emit_typed<T: Serialize>(&self, from_component: &str, event_type: &str, payload: &T) -> EmitResult {
        match serde_json::to_value(payload) {
            Ok(data) => self.emit(from_component, BrokerEvent::new(event_type, data)),
            Err(e) => {
                let result = EmitResult::rejected(BrokerError::Validation {
                    event_type: event_type.to_string(),
                    source: ValidationError::new("$", e.to_string()),
                });
                self.trace_emit(from_component, event_type, &result);
                result
            }
        }
    }

    /// Removes a registration. Unknown or already removed ids are ignored.
    pub fn unregister(&self, id: ListenerId) {
        self.shared.remove(id);
    }

    pub fn listener_count(&self) -> usize {
        self.shared.registry().len()
    }

    pub fn listener_count_for(&self, event_type: &str) -> usize {
        self.shared
            .registry()
            .values()
            .filter(|reg| reg.event_type == event_type)
            .count()
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.shared.registry().values().cloned().collect()
    }

    fn trace_emit(&self, from_component: &str, event_type: &str, result: &EmitResult) {
        if !self.shared.config.log_usage {
            return;
        }
        tracing::info!(
            target: USAGE_TARGET,
            component = from_component,
            event_type,
            listeners = result.delivered as u64,
            errors = result.errors.len() as u64,
            "event emitted"
        );
        if !result.errors.is_empty() {
            tracing::warn!(
                target: USAGE_TARGET,
                component = from_component,
                event_type,
                summary = %result.summary(),
                "emit reported errors"
            );
        }
    }
}

impl EventBus for Broker {
    fn register(&self, component_name: &str, event_type: &str, callback: Callback) -> ListenerId {
        self.shared.insert(component_name, event_type, callback)
    }

    fn emit(&self, from_component: &str, event: BrokerEvent) -> EmitResult {
        Broker::emit(self, from_component, event)
    }

    fn unregister(&self, id: ListenerId) {
        Broker::unregister(self, id)
    }
}

fn invoke(reg: &Registration, event: &BrokerEvent) -> Option<BrokerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| (reg.callback)(event))) {
        Ok(Ok(())) => None,
        Ok(Err(source)) => Some(BrokerError::Listener {
            component: reg.component_name.clone(),
            source,
        }),
        Err(payload) => Some(BrokerError::ListenerPanicked {
            component: reg.component_name.clone(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
