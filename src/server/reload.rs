// src/server/reload.rs

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Reload generation counter shared between the dispatcher and the server.
///
/// `trigger` bumps the generation and wakes every waiting request. Browsers
/// remember the last generation they saw and long-poll for a newer one.
#[derive(Debug, Clone, Default)]
pub struct ReloadSignal {
    inner: Arc<(Mutex<u64>, Condvar)>,
}

impl ReloadSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ask connected browsers to reload.
    pub fn trigger(&self) -> u64 {
        let (lock, cvar) = &*self.inner;
        let mut generation = lock.lock().unwrap_or_else(|e| e.into_inner());
        *generation += 1;
        cvar.notify_all();
        info!(generation = *generation, "reload triggered");
        *generation
    }

    /// Block until the generation exceeds `seen` or `timeout` elapses.
    ///
    /// Returns the current generation either way.
    pub fn wait_newer(&self, seen: u64, timeout: Duration) -> u64 {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut generation = lock.lock().unwrap_or_else(|e| e.into_inner());

        while *generation <= seen {
            let now = Instant::now();
            if now >= deadline {
                debug!(seen, "reload wait timed out");
                break;
            }
            let (guard, _) = cvar
                .wait_timeout(generation, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            generation = guard;
        }

        *generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_returns_immediately_when_already_newer() {
        let signal = ReloadSignal::new();
        signal.trigger();
        assert_eq!(signal.wait_newer(0, Duration::from_secs(5)), 1);
    }

    #[test]
    fn wait_times_out_without_trigger() {
        let signal = ReloadSignal::new();
        assert_eq!(signal.wait_newer(0, Duration::from_millis(20)), 0);
    }

    #[test]
    fn trigger_wakes_waiter() {
        let signal = ReloadSignal::new();
        let waiter = {
            let signal = signal.clone();
            thread::spawn(move || signal.wait_newer(0, Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        signal.trigger();
        assert_eq!(waiter.join().unwrap(), 1);
    }
}
