//! # Scheduler Tick Timer
//!
//! Converts elapsed simulated time into scheduler ticks.
//!
//! ## Philosophy
//!
//! **Determinism enables thorough testing.**
//!
//! The timer never reads a host clock. It only advances when told to, and
//! carries any remainder shorter than one interval into the next advance,
//! so `advance(400)` three times fires exactly one 1000 ms tick.
//!
//! # Examples
//!
//! ```
//! use sim_kernel::timer::TickTimer;
//!
//! let mut timer = TickTimer::new(1000);
//! assert_eq!(timer.advance(2500), 2);
//! assert_eq!(timer.advance(500), 1);
//! assert_eq!(timer.now_ms(), 3000);
//! ```

/// Fires one tick per elapsed interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickTimer {
    interval_ms: u64,
    now_ms: u64,
    carried_ms: u64,
    fired: u64,
}

impl TickTimer {
    /// Creates a timer at time 0; a zero interval is treated as 1 ms
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            now_ms: 0,
            carried_ms: 0,
            fired: 0,
        }
    }

    /// Advances time and returns how many ticks became due
    pub fn advance(&mut self, delta_ms: u64) -> u64 {
        self.now_ms = self.now_ms.saturating_add(delta_ms);
        let pending = self.carried_ms.saturating_add(delta_ms);
        let due = pending / self.interval_ms;
        self.carried_ms = pending % self.interval_ms;
        self.fired = self.fired.saturating_add(due);
        due
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Interval length in seconds, as fed to the scheduler
    pub fn interval_secs(&self) -> f64 {
        self.interval_ms as f64 / 1000.0
    }

    /// Total ticks fired since creation
    pub fn ticks_fired(&self) -> u64 {
        self.fired
    }

    /// Time until the next tick is due
    pub fn until_next_ms(&self) -> u64 {
        self.interval_ms - self.carried_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remainder_is_carried() {
        let mut timer = TickTimer::new(1000);
        assert_eq!(timer.advance(400), 0);
        assert_eq!(timer.advance(400), 0);
        assert_eq!(timer.until_next_ms(), 200);
        assert_eq!(timer.advance(400), 1);
        assert_eq!(timer.until_next_ms(), 800);
        assert_eq!(timer.ticks_fired(), 1);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let mut timer = TickTimer::new(0);
        assert_eq!(timer.interval_ms(), 1);
        assert_eq!(timer.advance(5), 5);
    }

    #[test]
    fn test_interval_secs() {
        assert_eq!(TickTimer::new(250).interval_secs(), 0.25);
    }
}
