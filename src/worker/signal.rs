use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// One-shot stop flag that sleeping tasks can wait on.
pub struct StopSignal {
    state: Mutex<bool>,
    wake: Condvar,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        StopSignal {
            state: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    pub fn raise(&self) {
        // A poisoned flag still gets raised.
        let mut stopped = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *stopped = true;
        self.wake.notify_all();
    }

    pub fn is_raised(&self) -> bool {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep up to `timeout`. Returns true when woken by [`raise`](Self::raise).
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            stopped = match self.wake.wait_timeout(stopped, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
        true
    }
}
