// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Read-only statistics: named counters and length-over-time integrals.
//!
//! An entity's statistics are captured into a [`Statistics`] snapshot with
//! [`crate::dds::create_statistics`]; refreshing re-reads the live values.
//! A refresh of a snapshot whose entity has been deleted and reincarnated
//! under the same handle value is rejected through the instance-id check.

use crate::core::handles::Handle;
use crate::core::time::{MonotonicTime, Time};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Kind of a statistics value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// Plain 32-bit counter.
    U32,
    /// Plain 64-bit counter.
    U64,
    /// Integral of a length over time: sum of `length * dt` in
    /// nanoseconds.
    LengthTime,
}

/// One named statistic.
#[derive(Debug, Clone)]
pub struct StatKeyValue {
    pub name: &'static str,
    pub kind: StatKind,
    pub value: u64,
}

/// Snapshot of an entity's statistics.
#[derive(Debug, Clone)]
pub struct Statistics {
    /// Handle of the entity the snapshot belongs to.
    pub entity: Handle,
    /// Instance id of the entity at snapshot creation; guards refresh
    /// against handle reincarnation.
    pub(crate) opaque: u64,
    /// Wall-clock time of the last refresh.
    pub time: Time,
    /// The values.
    pub kv: Vec<StatKeyValue>,
}

impl Statistics {
    /// Find a statistic by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&StatKeyValue> {
        self.kv.iter().find(|kv| kv.name == name)
    }
}

/// Monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn incr(&self) {
        self.add(1);
    }

    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Integrates a length over time: `sum(length * dt)`.
///
/// Updated whenever the underlying length changes; reading integrates up
/// to the current instant.
#[derive(Debug)]
pub struct LengthTimeMeter {
    state: Mutex<MeterState>,
}

#[derive(Debug)]
struct MeterState {
    current: u64,
    integral: u128,
    since: MonotonicTime,
}

impl Default for LengthTimeMeter {
    fn default() -> Self {
        LengthTimeMeter {
            state: Mutex::new(MeterState {
                current: 0,
                integral: 0,
                since: MonotonicTime::now(),
            }),
        }
    }
}

impl LengthTimeMeter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new length value.
    pub fn set(&self, length: u64) {
        let now = MonotonicTime::now();
        let mut st = self.state.lock();
        let dt = (now.nanos() - st.since.nanos()).max(0) as u128;
        st.integral += u128::from(st.current) * dt;
        st.current = length;
        st.since = now;
    }

    /// Current length.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.state.lock().current
    }

    /// Integral of length over time up to now, saturated to u64.
    #[must_use]
    pub fn integral(&self) -> u64 {
        let now = MonotonicTime::now();
        let st = self.state.lock();
        let dt = (now.nanos() - st.since.nanos()).max(0) as u128;
        let total = st.integral + u128::from(st.current) * dt;
        u64::try_from(total).unwrap_or(u64::MAX)
    }
}
