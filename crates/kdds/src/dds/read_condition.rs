// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Public read and query conditions.
//!
//! Thin wrappers over the cache-side condition core; created through
//! [`crate::dds::DataReader`]. The reader cache re-evaluates the trigger
//! on every mutation, so these are level-triggered over cache contents.

use super::condition::Condition;
use crate::core::handles::Handle;
use crate::core::signal::WaitsetSignal;
use crate::rhc::{InstanceStateMask, ReadConditionCore, SampleStateMask, ViewStateMask};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Condition triggered while the reader holds a sample matching the
/// state masks.
#[derive(Clone)]
pub struct ReadCondition {
    pub(crate) core: Arc<ReadConditionCore>,
    pub(crate) reader: Handle,
}

impl ReadCondition {
    /// Handle of the owning reader.
    #[must_use]
    pub fn reader_handle(&self) -> Handle {
        self.reader
    }

    #[must_use]
    pub fn sample_state_mask(&self) -> SampleStateMask {
        self.core.sample_mask
    }

    #[must_use]
    pub fn view_state_mask(&self) -> ViewStateMask {
        self.core.view_mask
    }

    #[must_use]
    pub fn instance_state_mask(&self) -> InstanceStateMask {
        self.core.instance_mask
    }
}

impl Condition for ReadCondition {
    fn trigger_value(&self) -> bool {
        self.core.trigger_value()
    }

    fn condition_id(&self) -> u64 {
        self.core.id()
    }

    fn add_waitset_signal(&self, signal: &Arc<dyn WaitsetSignal>) {
        self.core.add_signal(signal);
    }

    fn remove_waitset_signal(&self, signal_id: u64) {
        self.core.remove_signal(signal_id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for ReadCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadCondition")
            .field("reader", &self.reader)
            .finish()
    }
}

/// ReadCondition with a content predicate evaluated per sample.
#[derive(Clone)]
pub struct QueryCondition {
    pub(crate) base: ReadCondition,
}

impl QueryCondition {
    /// Handle of the owning reader.
    #[must_use]
    pub fn reader_handle(&self) -> Handle {
        self.base.reader
    }

    /// The underlying read condition.
    #[must_use]
    pub fn as_read_condition(&self) -> &ReadCondition {
        &self.base
    }
}

impl fmt::Debug for QueryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCondition")
            .field("base", &self.base)
            .finish()
    }
}

impl Condition for QueryCondition {
    fn trigger_value(&self) -> bool {
        self.base.trigger_value()
    }

    fn condition_id(&self) -> u64 {
        self.base.condition_id()
    }

    fn add_waitset_signal(&self, signal: &Arc<dyn WaitsetSignal>) {
        self.base.add_waitset_signal(signal);
    }

    fn remove_waitset_signal(&self, signal_id: u64) {
        self.base.remove_waitset_signal(signal_id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
