use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Time source for the poll-driven flows. Core logic never reads the wall
/// clock directly; tests substitute a scripted clock.
pub trait Clock {
    fn now_ms(&mut self) -> u64;
    fn sleep_ms(&mut self, ms: u64);
}

/// Wall-clock implementation (epoch milliseconds, real sleeps).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&mut self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Deterministic clock: `sleep_ms` advances time instead of blocking.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now_ms: u64,
    sleeps: Vec<u64>,
}

impl ManualClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now_ms,
            sleeps: Vec::new(),
        }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    /// Sleep durations requested so far, in order.
    pub fn sleeps(&self) -> &[u64] {
        &self.sleeps
    }
}

impl Clock for ManualClock {
    fn now_ms(&mut self) -> u64 {
        self.now_ms
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.sleeps.push(ms);
        self.now_ms += ms;
    }
}
