// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Cache-side state of read and query conditions.
//!
//! The public `ReadCondition`/`QueryCondition` objects wrap one of these
//! cores; the reader cache re-evaluates the trigger after every mutation
//! while still holding the cache lock, and wakes attached waitsets on a
//! false-to-true transition.

use super::state::{InstanceStateMask, SampleStateMask, ViewStateMask};
use crate::core::signal::{SignalSet, WaitsetSignal};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Content predicate evaluated over the serialized payload.
pub type QueryPredicate = Box<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Shared state of a read/query condition.
pub struct ReadConditionCore {
    id: u64,
    pub sample_mask: SampleStateMask,
    pub view_mask: ViewStateMask,
    pub instance_mask: InstanceStateMask,
    predicate: Option<QueryPredicate>,
    trigger: AtomicBool,
    signals: SignalSet,
}

impl ReadConditionCore {
    pub fn new(
        sample_mask: SampleStateMask,
        view_mask: ViewStateMask,
        instance_mask: InstanceStateMask,
        predicate: Option<QueryPredicate>,
    ) -> Arc<Self> {
        static NEXT_ID: AtomicU64 = AtomicU64::new(2_000_000);
        Arc::new(ReadConditionCore {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            sample_mask,
            view_mask,
            instance_mask,
            predicate,
            trigger: AtomicBool::new(false),
            signals: SignalSet::new(),
        })
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn trigger_value(&self) -> bool {
        self.trigger.load(Ordering::Acquire)
    }

    /// True for plain read conditions and for query conditions whose
    /// predicate accepts the payload. Sentinels (no payload) only pass
    /// predicate-free conditions.
    #[must_use]
    pub fn accepts_payload(&self, payload: Option<&[u8]>) -> bool {
        match (&self.predicate, payload) {
            (None, _) => true,
            (Some(pred), Some(bytes)) => pred(bytes),
            (Some(_), None) => false,
        }
    }

    #[must_use]
    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    /// Update the trigger; wakes waitsets on a false-to-true transition.
    pub fn set_trigger(&self, value: bool) {
        let before = self.trigger.swap(value, Ordering::AcqRel);
        if value && !before {
            self.signals.notify();
        }
    }

    pub fn add_signal(&self, signal: &Arc<dyn WaitsetSignal>) {
        self.signals.add(signal);
        if self.trigger_value() {
            signal.signal();
        }
    }

    pub fn remove_signal(&self, signal_id: u64) {
        self.signals.remove(signal_id);
    }
}
