use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Target used for every usage trace line the broker writes.
pub const USAGE_TARGET: &str = "brokerkit::usage";

/// Usage lines kept in memory before the oldest are dropped.
const RING_BUFFER_SIZE: usize = 500;

#[derive(Clone, serde::Serialize, Debug, PartialEq)]
pub struct UsageLine {
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl UsageLine {
    pub fn new(level: &str, target: &str, message: String) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
            level: level.to_uppercase(),
            target: target.to_string(),
            message,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Bounded in-memory sink for usage lines, shared between the layer and readers.
#[derive(Clone, Debug)]
pub struct UsageLog {
    inner: Arc<Mutex<VecDeque<UsageLine>>>,
    capacity: usize,
}

impl Default for UsageLog {
    fn default() -> Self {
        Self::with_capacity(RING_BUFFER_SIZE)
    }
}

impl UsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, line: UsageLine) {
        let mut lines = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push_back(line);
        while lines.len() > self.capacity {
            lines.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<UsageLine> {
        match self.inner.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn clear(&self) {
        match self.inner.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracing layer that copies usage events into a [`UsageLog`].
pub struct UsageLayer {
    log: UsageLog,
}

impl UsageLayer {
    pub fn new(log: UsageLog) -> Self {
        Self { log }
    }
}

impl<S> Layer<S> for UsageLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() != USAGE_TARGET {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut line = UsageLine::new(metadata.level().as_str(), metadata.target(), visitor.message);
        line.fields = visitor.fields;
        self.log.push(line);
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let field_value = format!("{:?}", value);
        if field.name() == "message" {
            self.message = field_value;
        } else {
            self.fields.insert(field.name().to_string(), field_value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }
}
