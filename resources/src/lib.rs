//! # Resources
//!
//! Memory accounting primitives for SimOS.
//!
//! ## Philosophy
//!
//! - **Resources are finite and must be explicit**
//! - **Budgets are enforced, not advisory**: an allocation that would
//!   overflow the pool is refused and leaves the pool untouched
//! - **Accounting is deterministic and testable**
//!
//! ## Core Concepts
//!
//! - [`MemoryUnits`]: an amount of simulated memory, in megabytes
//! - [`MemoryPool`]: the bounded pool every process reservation draws from
//!
//! ## Non-Goals
//!
//! This is NOT a real allocator. Nothing here touches host memory; the pool
//! only keeps the books so that process creation can be denied when the
//! simulated machine is full.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Memory units (megabytes of simulated memory)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemoryUnits(pub u64);

impl MemoryUnits {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_mb(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for MemoryUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MB", self.0)
    }
}

/// Memory accounting errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("insufficient memory: requested {requested}, available {available}")]
    Exhausted {
        requested: MemoryUnits,
        available: MemoryUnits,
    },
}

/// Bounded memory pool
///
/// Invariant: `used <= total` at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPool {
    total: MemoryUnits,
    used: MemoryUnits,
}

impl MemoryPool {
    /// Creates an empty pool of the given size
    pub fn new(total: MemoryUnits) -> Self {
        Self {
            total,
            used: MemoryUnits::zero(),
        }
    }

    /// Reserves `size` if it fits; otherwise leaves the pool unchanged
    pub fn allocate(&mut self, size: MemoryUnits) -> Result<(), MemoryError> {
        match self.used.checked_add(size) {
            Some(next) if next <= self.total => {
                self.used = next;
                Ok(())
            }
            _ => Err(MemoryError::Exhausted {
                requested: size,
                available: self.available(),
            }),
        }
    }

    /// Returns `size` to the pool, clamped at zero
    pub fn free(&mut self, size: MemoryUnits) {
        if size > self.used {
            log::warn!("memory free of {} exceeds used {}; clamping", size, self.used);
        }
        self.used = self.used.saturating_sub(size);
    }

    pub fn total(&self) -> MemoryUnits {
        self.total
    }

    pub fn used(&self) -> MemoryUnits {
        self.used
    }

    pub fn available(&self) -> MemoryUnits {
        self.total.saturating_sub(self.used)
    }

    /// Used memory as a percentage of the total (0 for an empty pool)
    pub fn usage_percent(&self) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        self.used.0 as f64 * 100.0 / self.total.0 as f64
    }
}

impl fmt::Display for MemoryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} ({:.1}%)",
            self.used.0,
            self.total,
            self.usage_percent()
        )
    }
}
