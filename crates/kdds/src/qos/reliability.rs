// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Delivery guarantee policies: RELIABILITY, DURABILITY and HISTORY.

use crate::core::time::Duration;

/// Reliability kinds, ordered weakest to strongest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReliabilityKind {
    /// Fire-and-forget; samples may be dropped.
    #[default]
    BestEffort = 0,
    /// Samples are retained until acknowledged by matched readers.
    Reliable = 1,
}

/// RELIABILITY policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reliability {
    /// Delivery guarantee.
    pub kind: ReliabilityKind,
    /// How long a reliable `write` may block when the writer cache is full.
    pub max_blocking_time: Duration,
}

impl Reliability {
    /// Create BEST_EFFORT reliability (default).
    pub fn best_effort() -> Self {
        Self {
            kind: ReliabilityKind::BestEffort,
            max_blocking_time: Duration::ZERO,
        }
    }

    /// Create RELIABLE reliability with the conventional 100ms blocking time.
    pub fn reliable() -> Self {
        Self {
            kind: ReliabilityKind::Reliable,
            max_blocking_time: Duration::from_millis(100),
        }
    }

    /// Create RELIABLE reliability with an explicit blocking time.
    pub fn reliable_with_blocking(max_blocking_time: Duration) -> Self {
        Self {
            kind: ReliabilityKind::Reliable,
            max_blocking_time,
        }
    }

    /// Check if this policy is reliable.
    pub fn is_reliable(&self) -> bool {
        self.kind == ReliabilityKind::Reliable
    }
}

impl Default for Reliability {
    fn default() -> Self {
        Self::best_effort()
    }
}

/// DURABILITY kinds, ordered weakest to strongest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Durability {
    /// Samples exist only while in flight.
    #[default]
    Volatile = 0,
    /// The writer keeps history for late-joining readers.
    TransientLocal = 1,
    /// History outlives the writer (durability service).
    Transient = 2,
    /// History outlives the process.
    Persistent = 3,
}

impl Durability {
    /// Check whether a late-joining reader receives historical samples.
    pub fn keeps_history(&self) -> bool {
        *self >= Durability::TransientLocal
    }
}

/// HISTORY policy: how many samples to retain per instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum History {
    /// Keep the most recent `depth` samples of each instance.
    KeepLast(usize),
    /// Keep every sample, bounded only by resource limits.
    KeepAll,
}

impl History {
    /// Per-instance depth bound, if any.
    pub fn depth(&self) -> Option<usize> {
        match self {
            History::KeepLast(depth) => Some(*depth),
            History::KeepAll => None,
        }
    }

    pub fn is_keep_all(&self) -> bool {
        matches!(self, History::KeepAll)
    }
}

impl Default for History {
    fn default() -> Self {
        History::KeepLast(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliability_ordering() {
        assert!(ReliabilityKind::BestEffort < ReliabilityKind::Reliable);
    }

    #[test]
    fn test_durability_ordering() {
        assert!(Durability::Volatile < Durability::TransientLocal);
        assert!(Durability::TransientLocal < Durability::Transient);
        assert!(Durability::Transient < Durability::Persistent);
        assert!(!Durability::Volatile.keeps_history());
        assert!(Durability::TransientLocal.keeps_history());
    }

    #[test]
    fn test_history_depth() {
        assert_eq!(History::KeepLast(5).depth(), Some(5));
        assert_eq!(History::KeepAll.depth(), None);
        assert_eq!(History::default(), History::KeepLast(1));
    }
}
