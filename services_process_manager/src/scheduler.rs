//! Run queue and CPU telemetry
//!
//! The numbers produced here are plausible, not measured. Nothing in this
//! module decides when real work runs.

use crate::{Priority, ProcessType};
use core_types::Pid;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Largest change of a process's cpu% in one tick
pub const WALK_STEP: f64 = 5.0;

/// Range of the cpu% a freshly created process starts with
pub const INITIAL_SPIKE: (f64, f64) = (5.0, 20.0);

/// Baseline cpu% band for a process type
pub fn baseline(kind: ProcessType) -> (f64, f64) {
    match kind {
        ProcessType::System => (1.0, 5.0),
        ProcessType::User => (8.0, 30.0),
    }
}

/// Round-robin queue of runnable pids
#[derive(Debug, Clone, Default)]
pub struct RunQueue {
    entries: VecDeque<Pid>,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, pid: Pid) {
        self.entries.push_back(pid);
    }

    pub fn pop_front(&mut self) -> Option<Pid> {
        self.entries.pop_front()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.entries.contains(&pid)
    }

    pub fn retain(&mut self, keep: impl FnMut(&Pid) -> bool) {
        self.entries.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pid> {
        self.entries.iter()
    }

    /// Sorts by priority, keeping arrival order among equals
    pub fn sort_by_priority(&mut self, priority_of: impl Fn(Pid) -> Priority) {
        self.entries
            .make_contiguous()
            .sort_by_key(|pid| priority_of(*pid));
    }
}

/// Source of simulated cpu readings
#[derive(Debug, Clone)]
pub struct Telemetry {
    rng: StdRng,
}

impl Telemetry {
    /// Seeded telemetry is reproducible; `None` draws from entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Cpu% of a process at creation
    pub fn initial_spike(&mut self) -> f64 {
        self.rng.gen_range(INITIAL_SPIKE.0..=INITIAL_SPIKE.1)
    }

    /// Next cpu% for a scheduled process
    ///
    /// One step of at most [`WALK_STEP`], kept inside the type's baseline band.
    pub fn walk(&mut self, current: f64, kind: ProcessType) -> f64 {
        let (low, high) = baseline(kind);
        let step = self.rng.gen_range(-WALK_STEP..=WALK_STEP);
        (current + step).clamp(low, high).clamp(0.0, 100.0)
    }
}
