use crate::bus::Shared;
use crate::event::BrokerEvent;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};

/// Callback invoked for each matching event. An `Err` or a panic is reported
/// as a listener error without stopping delivery to the others.
pub type Callback = Arc<dyn Fn(&BrokerEvent) -> anyhow::Result<()> + Send + Sync>;

/// Identifies one registration. Ids are allocated in increasing order, so
/// ordering by id is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Clone)]
pub struct Registration {
    pub id: ListenerId,
    /// Diagnostic label only; never used for routing.
    pub component_name: String,
    pub event_type: String,
    pub(crate) callback: Callback,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("component_name", &self.component_name)
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

/// Scoped registration: unregisters when dropped.
///
/// Holds the broker weakly, so an outstanding guard never keeps it alive.
#[must_use = "dropping the guard unregisters the listener immediately"]
pub struct ListenerGuard {
    id: ListenerId,
    shared: Weak<Shared>,
}

impl ListenerGuard {
    pub(crate) fn new(id: ListenerId, shared: &Arc<Shared>) -> Self {
        Self {
            id,
            shared: Arc::downgrade(shared),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.id);
        }
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard").field("id", &self.id).finish()
    }
}
