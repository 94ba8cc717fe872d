use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What listeners receive: the event type and its validated payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

impl BrokerEvent {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_type_key() {
        let event = BrokerEvent::new("greet", json!({ "name": "Ann" }));
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded, json!({ "type": "greet", "data": { "name": "Ann" } }));
    }

    #[test]
    fn decode_into_struct() {
        #[derive(Deserialize)]
        struct Greet {
            name: String,
        }
        let event = BrokerEvent::new("greet", json!({ "name": "Ann" }));
        let greet: Greet = event.decode().unwrap();
        assert_eq!(greet.name, "Ann");
    }
}
