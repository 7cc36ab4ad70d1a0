// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Conditions: boolean predicates observable through waitsets.
//!
//! A `Condition` is evaluated by the entity machinery whenever relevant
//! state changes; waitsets registered with the condition are woken on a
//! false-to-true transition of the trigger value.

use crate::core::signal::{SignalSet, WaitsetSignal};
use crate::graph::status::StatusMask;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Base interface for all condition kinds.
pub trait Condition: Send + Sync + fmt::Debug {
    /// Current trigger value.
    fn trigger_value(&self) -> bool;

    /// Unique identifier for attach/detach bookkeeping.
    fn condition_id(&self) -> u64;

    /// Register a waitset signal to wake blocked waiters.
    fn add_waitset_signal(&self, signal: &Arc<dyn WaitsetSignal>);

    /// Remove a previously registered waitset signal.
    fn remove_waitset_signal(&self, signal_id: u64);

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

fn next_condition_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Condition over an entity's communication statuses.
///
/// Triggered iff `(raised_statuses & enabled_statuses) != 0`. Every
/// entity owns one; the entity machinery feeds raised bits through
/// [`StatusCondition::sync_active`].
pub struct StatusCondition {
    id: u64,
    enabled: AtomicU32,
    active: AtomicU32,
    signals: SignalSet,
}

impl StatusCondition {
    #[must_use]
    pub fn new() -> Self {
        StatusCondition {
            id: next_condition_id(),
            enabled: AtomicU32::new(StatusMask::ALL.bits()),
            active: AtomicU32::new(0),
            signals: SignalSet::new(),
        }
    }

    /// Select which statuses the condition watches.
    pub fn set_enabled_statuses(&self, mask: StatusMask) {
        self.enabled.store(mask.bits(), Ordering::Release);
        if self.trigger_value() {
            self.signals.notify();
        }
    }

    #[must_use]
    pub fn enabled_statuses(&self) -> StatusMask {
        StatusMask::from_bits(self.enabled.load(Ordering::Acquire))
    }

    /// Mirror the entity's raised status bits into the condition.
    pub(crate) fn sync_active(&self, raised: StatusMask) {
        let before = self.active.swap(raised.bits(), Ordering::AcqRel);
        let enabled = self.enabled.load(Ordering::Acquire);
        let was = before & enabled != 0;
        let now = raised.bits() & enabled != 0;
        if now && !was {
            self.signals.notify();
        }
    }
}

impl Condition for StatusCondition {
    fn trigger_value(&self) -> bool {
        self.active.load(Ordering::Acquire) & self.enabled.load(Ordering::Acquire) != 0
    }

    fn condition_id(&self) -> u64 {
        self.id
    }

    fn add_waitset_signal(&self, signal: &Arc<dyn WaitsetSignal>) {
        self.signals.add(signal);
        if self.trigger_value() {
            signal.signal();
        }
    }

    fn remove_waitset_signal(&self, signal_id: u64) {
        self.signals.remove(signal_id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Default for StatusCondition {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusCondition")
            .field("id", &self.id)
            .finish()
    }
}

/// Application-controlled condition.
pub struct GuardCondition {
    id: u64,
    trigger: AtomicBool,
    signals: SignalSet,
}

impl GuardCondition {
    #[must_use]
    pub fn new() -> Self {
        GuardCondition {
            id: next_condition_id(),
            trigger: AtomicBool::new(false),
            signals: SignalSet::new(),
        }
    }

    /// Set the trigger value; `true` wakes attached waitsets.
    pub fn set_trigger_value(&self, value: bool) {
        let before = self.trigger.swap(value, Ordering::AcqRel);
        if value && !before {
            self.signals.notify();
        }
    }
}

impl Condition for GuardCondition {
    fn trigger_value(&self) -> bool {
        self.trigger.load(Ordering::Acquire)
    }

    fn condition_id(&self) -> u64 {
        self.id
    }

    fn add_waitset_signal(&self, signal: &Arc<dyn WaitsetSignal>) {
        self.signals.add(signal);
        if self.trigger_value() {
            signal.signal();
        }
    }

    fn remove_waitset_signal(&self, signal_id: u64) {
        self.signals.remove(signal_id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Default for GuardCondition {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GuardCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardCondition")
            .field("id", &self.id)
            .finish()
    }
}

/// Entities that own a StatusCondition (enables `WaitSet::attach`).
pub trait HasStatusCondition {
    /// The entity's status condition.
    fn status_condition(&self) -> Arc<StatusCondition>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Probe {
        hits: AtomicUsize,
    }

    impl WaitsetSignal for Probe {
        fn id(&self) -> u64 {
            99
        }
        fn signal(&self) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_status_condition_trigger() {
        let cond = StatusCondition::new();
        assert!(!cond.trigger_value());
        cond.sync_active(StatusMask::DATA_AVAILABLE);
        assert!(cond.trigger_value());
        cond.sync_active(StatusMask::NONE);
        assert!(!cond.trigger_value());
    }

    #[test]
    fn test_status_condition_mask_filters() {
        let cond = StatusCondition::new();
        cond.set_enabled_statuses(StatusMask::SUBSCRIPTION_MATCHED);
        cond.sync_active(StatusMask::DATA_AVAILABLE);
        assert!(!cond.trigger_value());
        cond.sync_active(StatusMask::DATA_AVAILABLE | StatusMask::SUBSCRIPTION_MATCHED);
        assert!(cond.trigger_value());
    }

    #[test]
    fn test_status_condition_signals_on_edge() {
        let cond = StatusCondition::new();
        let probe = Arc::new(Probe {
            hits: AtomicUsize::new(0),
        });
        let sig: Arc<dyn WaitsetSignal> = probe.clone();
        cond.add_waitset_signal(&sig);
        cond.sync_active(StatusMask::DATA_AVAILABLE);
        cond.sync_active(StatusMask::DATA_AVAILABLE); // no edge
        assert_eq!(probe.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_condition() {
        let guard = GuardCondition::new();
        assert!(!guard.trigger_value());
        guard.set_trigger_value(true);
        assert!(guard.trigger_value());
        guard.set_trigger_value(false);
        assert!(!guard.trigger_value());
    }

    #[test]
    fn test_ids_unique() {
        assert_ne!(StatusCondition::new().condition_id(), GuardCondition::new().condition_id());
    }
}
