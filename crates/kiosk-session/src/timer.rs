//! Owned session timer
//!
//! One handle, at most one armed timer. Arming replaces whatever was armed,
//! so the inactivity and completion timers can never both be live.

use std::time::Duration;
use tokio::task::JoinHandle;

/// What an armed timer is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Quiet period in an active session
    Inactivity,
    /// Thank-you display after completion
    CompletionDisplay,
}

/// Notice that a timer elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    /// Timer that elapsed
    pub kind: TimerKind,
    generation: u64,
}

#[derive(Debug)]
struct Armed {
    kind: TimerKind,
    generation: u64,
    task: JoinHandle<()>,
}

/// Explicitly owned timer handle
#[derive(Debug, Default)]
pub struct TimerHandle {
    armed: Option<Armed>,
    generation: u64,
}

impl TimerHandle {
    /// Create a disarmed handle
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `after`, cancelling any armed timer. `notify` runs on the
    /// runtime once the period elapses.
    pub fn arm<F>(&mut self, kind: TimerKind, after: Duration, notify: F)
    where
        F: FnOnce(TimerFired) + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let fired = TimerFired {
            kind,
            generation: self.generation,
        };
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            notify(fired);
        });
        self.armed = Some(Armed {
            kind,
            generation: self.generation,
            task,
        });
    }

    /// Disarm; a notice already delivered for the cancelled timer will be rejected by [`accept`](Self::accept)
    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.task.abort();
        }
    }

    /// Whether a timer is armed
    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Kind of the armed timer
    #[inline]
    #[must_use]
    pub fn armed_kind(&self) -> Option<TimerKind> {
        self.armed.as_ref().map(|a| a.kind)
    }

    /// Match a fire notice against the armed timer. Returns its kind and
    /// disarms when it is the current one; stale notices yield `None`.
    pub fn accept(&mut self, fired: TimerFired) -> Option<TimerKind> {
        match &self.armed {
            Some(armed) if armed.generation == fired.generation => {
                self.armed = None;
                Some(fired.kind)
            }
            _ => None,
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
