//! Discard timers for stored SDUs.
//!
//! One timer per stored TX COUNT, armed when the SDU enters the
//! retransmission queue and cancelled when RLC confirms delivery. Timers
//! are polled: the owning entity calls `expired()` on its scheduler tick
//! and performs the discard sequence itself, removing the timer last.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// A single armed discard timer.
#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    armed_at: Instant,
    timeout: Duration,
}

impl ArmedTimer {
    fn is_expired(&self) -> bool {
        self.armed_at.elapsed() >= self.timeout
    }
}

/// Discard timers keyed by TX COUNT.
#[derive(Debug, Default)]
pub struct DiscardTimerManager {
    timers: BTreeMap<u32, ArmedTimer>,
}

impl DiscardTimerManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
        }
    }

    /// Arms a timer for the given COUNT. Re-arming an existing COUNT
    /// restarts its timer.
    pub fn arm(&mut self, count: u32, timeout: Duration) {
        self.timers.insert(
            count,
            ArmedTimer {
                armed_at: Instant::now(),
                timeout,
            },
        );
    }

    /// Cancels the timer for the given COUNT. Returns true if one existed.
    pub fn cancel(&mut self, count: u32) -> bool {
        self.timers.remove(&count).is_some()
    }

    /// Returns the COUNTs of all expired timers, in key order.
    ///
    /// Expired timers stay armed until cancelled, so the caller can run
    /// its discard sequence and remove the timer as the final step.
    pub fn expired(&self) -> Vec<u32> {
        self.timers
            .iter()
            .filter(|(_, timer)| timer.is_expired())
            .map(|(&count, _)| count)
            .collect()
    }

    /// True if a timer is armed for the given COUNT.
    pub fn contains(&self, count: u32) -> bool {
        self.timers.contains_key(&count)
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// True if no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Cancels all timers.
    pub fn clear(&mut self) {
        self.timers.clear();
    }
}
