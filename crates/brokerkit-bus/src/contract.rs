use crate::error::{BrokerError, BrokerResult};
use crate::schema::Validator;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Immutable mapping from event type to the validator for its payload.
#[derive(Clone, Default)]
pub struct ContractSet {
    contracts: Arc<BTreeMap<String, Arc<dyn Validator>>>,
}

#[derive(Default)]
pub struct ContractSetBuilder {
    contracts: BTreeMap<String, Arc<dyn Validator>>,
}

impl ContractSetBuilder {
    /// Adds a contract. A second contract for the same event type replaces
    /// the first.
    pub fn contract<V>(mut self, event_type: impl Into<String>, validator: V) -> Self
    where
        V: Validator + 'static,
    {
        let event_type = event_type.into();
        if self
            .contracts
            .insert(event_type.clone(), Arc::new(validator))
            .is_some()
        {
            tracing::warn!(event_type = %event_type, "contract replaced");
        }
        self
    }

    pub fn build(self) -> ContractSet {
        ContractSet {
            contracts: Arc::new(self.contracts),
        }
    }
}

impl ContractSet {
    pub fn builder() -> ContractSetBuilder {
        ContractSetBuilder::default()
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.contracts.contains_key(event_type)
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Checks `data` against the contract for `event_type` and returns the
    /// payload listeners should receive.
    pub fn validate(&self, event_type: &str, data: &Value) -> BrokerResult<Value> {
        let validator = self
            .contracts
            .get(event_type)
            .ok_or_else(|| BrokerError::UnknownEventType(event_type.to_string()))?;
        validator
            .validate(data)
            .map_err(|source| BrokerError::Validation {
                event_type: event_type.to_string(),
                source,
            })
    }
}

impl fmt::Debug for ContractSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.contracts.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::json;

    fn contracts() -> ContractSet {
        ContractSet::builder()
            .contract("greet", Schema::object([("name", Schema::String)]))
            .contract("tick", Schema::Integer)
            .build()
    }

    #[test]
    fn lists_event_types_in_order() {
        let set = contracts();
        assert_eq!(set.len(), 2);
        assert_eq!(set.event_types().collect::<Vec<_>>(), vec!["greet", "tick"]);
        assert!(set.contains("tick"));
        assert!(!set.contains("tock"));
    }

    #[test]
    fn validate_dispatches_to_contract() {
        let set = contracts();
        assert_eq!(set.validate("tick", &json!(3)).unwrap(), json!(3));

        let err = set.validate("greet", &json!({ "name": 1 })).unwrap_err();
        match err {
            BrokerError::Validation { event_type, source } => {
                assert_eq!(event_type, "greet");
                assert_eq!(source.issues[0].path, "$.name");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_reported() {
        let err = contracts().validate("tock", &json!(null)).unwrap_err();
        assert!(matches!(err, BrokerError::UnknownEventType(t) if t == "tock"));
    }

    #[test]
    fn empty_set_is_allowed() {
        let set = ContractSet::builder().build();
        assert!(set.is_empty());
        assert_eq!(format!("{set:?}"), "{}");
    }
}
