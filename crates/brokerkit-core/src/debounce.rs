use crate::config::DebounceConfig;
use crate::error::{CoreError, CoreResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Action<A> = Arc<dyn Fn(A) + Send + Sync>;

/// Delays `action` until `delay` has passed without another `invoke`.
///
/// Each `invoke` aborts the pending run and schedules a new one, so a burst of
/// calls results in a single run carrying the last call's arguments. Dropping
/// the debouncer cancels whatever is still pending.
pub struct Debouncer<A> {
    action: Action<A>,
    delay: Duration,
    handle: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<A: Send + 'static> Debouncer<A> {
    /// Binds to the tokio runtime of the caller.
    pub fn new<F>(delay: Duration, action: F) -> CoreResult<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        let handle = Handle::try_current()
            .map_err(|e| CoreError::Runtime(format!("debouncer needs a tokio runtime: {e}")))?;
        Ok(Self::with_handle(handle, delay, action))
    }

    pub fn from_config<F>(cfg: &DebounceConfig, action: F) -> CoreResult<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::new(Duration::from_millis(cfg.delay_ms), action)
    }

    pub fn with_handle<F>(handle: Handle, delay: Duration, action: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            action: Arc::new(action),
            delay,
            handle,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn invoke(&self, args: A) {
        let deadline = Instant::now() + self.delay;
        let action = Arc::clone(&self.action);

        let mut pending = self.lock_pending();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            action(args);
        }));
    }

    /// Drops the pending run, if any. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        match self.lock_pending().take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.lock_pending()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        let pending = match self.pending.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = pending {
            task.abort();
        }
    }
}
