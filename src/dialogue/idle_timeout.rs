//! Idle-timeout monitor: nudges the user after a stretch of inactivity.
//!
//! The deadline belongs to whoever armed the timer last, while the callback is
//! always the most recently supplied one, even for a timer armed earlier.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

type Callback = Arc<dyn Fn() + Send + Sync>;

pub struct IdleTimeout {
    timeout: Duration,
    enabled: bool,
    on_timeout: Arc<Mutex<Callback>>,
    pending: Option<JoinHandle<()>>,
}

impl IdleTimeout {
    pub fn new<F>(timeout: Duration, on_timeout: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(on_timeout);
        Self {
            timeout,
            enabled: true,
            on_timeout: Arc::new(Mutex::new(callback)),
            pending: None,
        }
    }

    /// Replace the callback. An already-armed timer will call the new one.
    pub fn set_on_timeout<F>(&self, on_timeout: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut slot = self
            .on_timeout
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(on_timeout);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.clear_timer();
        }
    }

    /// Cancel any pending timer and, if enabled, arm a fresh window.
    /// Must be called from within a tokio runtime.
    pub fn reset_timeout(&mut self) {
        self.clear_timer();
        if !self.enabled {
            return;
        }

        let timeout = self.timeout;
        let on_timeout = self.on_timeout.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let callback = on_timeout
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            callback();
        }));
    }

    /// Cancel any pending timer without re-arming.
    pub fn clear_timer(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for IdleTimeout {
    fn drop(&mut self) {
        self.clear_timer();
    }
}
