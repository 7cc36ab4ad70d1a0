// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Time representation: signed 64-bit nanosecond counts.
//!
//! Two epochs coexist and must not be mixed:
//!
//! - [`Time`] is wall-clock time (Unix epoch). Source timestamps and
//!   lifespan expiry use this epoch.
//! - [`MonotonicTime`] is a monotonic clock used for deadlines and
//!   auto-purge timers; it never jumps backwards.
//!
//! [`Duration`] is the common span type. `INFINITE` is `i64::MAX` and
//! saturates under arithmetic, so `now + INFINITE` stays infinite instead
//! of wrapping.

use std::time::{SystemTime, UNIX_EPOCH};

/// A span of time in nanoseconds. Negative durations are invalid as QoS
/// values but representable to keep subtraction total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(pub i64);

impl Duration {
    /// The infinite duration (`i64::MAX` nanoseconds).
    pub const INFINITE: Duration = Duration(i64::MAX);
    /// Zero-length duration.
    pub const ZERO: Duration = Duration(0);

    #[must_use]
    pub const fn from_nanos(ns: i64) -> Self {
        Duration(ns)
    }

    #[must_use]
    pub const fn from_micros(us: i64) -> Self {
        Duration(us * 1_000)
    }

    #[must_use]
    pub const fn from_millis(ms: i64) -> Self {
        Duration(ms * 1_000_000)
    }

    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Duration(secs * 1_000_000_000)
    }

    #[must_use]
    pub const fn nanos(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_infinite(self) -> bool {
        self.0 == i64::MAX
    }

    /// Convert to `std::time::Duration`. Infinite maps to the maximum
    /// representable std duration; negative clamps to zero.
    #[must_use]
    pub fn to_std(self) -> std::time::Duration {
        if self.0 <= 0 {
            std::time::Duration::ZERO
        } else {
            std::time::Duration::from_nanos(self.0 as u64)
        }
    }
}

/// Wall-clock timestamp: nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(pub i64);

impl Time {
    /// Sentinel for "no timestamp".
    pub const INVALID: Time = Time(i64::MIN);

    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(std::time::Duration::ZERO);
        Time(since.as_nanos() as i64)
    }

    #[must_use]
    pub const fn nanos(self) -> i64 {
        self.0
    }

    /// Saturating addition of a duration.
    #[must_use]
    pub fn add_duration(self, d: Duration) -> Self {
        Time(self.0.saturating_add(d.0))
    }
}

/// Monotonic timestamp: nanoseconds from an arbitrary process-local origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicTime(pub i64);

impl MonotonicTime {
    /// The end of time; a deadline that never passes.
    pub const NEVER: MonotonicTime = MonotonicTime(i64::MAX);

    /// Current monotonic time.
    #[must_use]
    pub fn now() -> Self {
        use std::sync::OnceLock;
        use std::time::Instant;
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        let origin = *ORIGIN.get_or_init(Instant::now);
        MonotonicTime(origin.elapsed().as_nanos() as i64)
    }

    #[must_use]
    pub const fn nanos(self) -> i64 {
        self.0
    }

    /// Deadline `d` from now; infinite durations produce [`Self::NEVER`].
    #[must_use]
    pub fn deadline_after(d: Duration) -> Self {
        if d.is_infinite() {
            MonotonicTime::NEVER
        } else {
            MonotonicTime(Self::now().0.saturating_add(d.0))
        }
    }

    /// Time remaining until this deadline, clamped at zero.
    #[must_use]
    pub fn remaining(self) -> Duration {
        if self == MonotonicTime::NEVER {
            return Duration::INFINITE;
        }
        Duration((self.0 - Self::now().0).max(0))
    }

    #[must_use]
    pub fn has_passed(self) -> bool {
        self != MonotonicTime::NEVER && Self::now().0 >= self.0
    }
}

impl std::ops::Sub for Time {
    type Output = Duration;
    fn sub(self, rhs: Time) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Sub for MonotonicTime {
    type Output = Duration;
    fn sub(self, rhs: MonotonicTime) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}
