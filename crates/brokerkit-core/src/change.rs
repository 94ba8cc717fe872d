use crate::error::CoreResult;
use serde::Serialize;

/// Remembers the last observed value and fires a callback only when the
/// canonical JSON form of a new value differs from it.
///
/// The check-then-update in [`ChangeTracker::on_change`] takes `&mut self`, so
/// sharing a tracker across threads needs an outer lock.
#[derive(Debug, Clone)]
pub struct ChangeTracker<T> {
    last: Option<Observed<T>>,
}

#[derive(Debug, Clone)]
struct Observed<T> {
    value: T,
    canonical: String,
}

impl<T> Default for ChangeTracker<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T: Serialize> ChangeTracker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `value` already observed; an equal value will not fire.
    pub fn with_initial(value: T) -> CoreResult<Self> {
        let canonical = canonical_form(&value)?;
        Ok(Self {
            last: Some(Observed { value, canonical }),
        })
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_ref().map(|o| &o.value)
    }

    /// Returns `true` when `callback` ran. A value that fails to serialize
    /// leaves the tracker untouched.
    pub fn on_change<F>(&mut self, value: T, callback: F) -> CoreResult<bool>
    where
        F: FnOnce(&T, Option<&T>),
    {
        let canonical = canonical_form(&value)?;
        if let Some(prev) = &self.last {
            if prev.canonical == canonical {
                return Ok(false);
            }
        }

        callback(&value, self.last());
        self.last = Some(Observed { value, canonical });
        Ok(true)
    }
}

/// Goes through `Value` so object keys come out sorted regardless of the
/// source map's iteration order.
fn canonical_form<T: Serialize>(value: &T) -> CoreResult<String> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&value)?)
}
