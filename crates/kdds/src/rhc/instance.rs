// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Per-instance record of the reader history cache.

use super::state::{InstanceState, ViewState};
use crate::core::guid::Guid;
use crate::core::time::{MonotonicTime, Time};
use std::collections::VecDeque;
use std::sync::Arc;

/// One cached sample. `payload` is `None` for dispose/unregister
/// sentinels (valid_data = false).
#[derive(Debug, Clone)]
pub(crate) struct RhcSample {
    pub payload: Option<Arc<[u8]>>,
    pub writer_guid: Guid,
    pub seq: u64,
    pub source_timestamp: Time,
    pub reception_timestamp: Time,
    /// Wall-clock instant at which the sample's lifespan expires.
    pub expiry: Time,
    pub read: bool,
    /// Generation counters at the moment the sample was accepted.
    pub disposed_generation: u32,
    pub no_writers_generation: u32,
}

impl RhcSample {
    pub fn is_valid(&self) -> bool {
        self.payload.is_some()
    }

    pub fn generation(&self) -> u32 {
        self.disposed_generation + self.no_writers_generation
    }
}

/// Instance record: key, state machine, writer set and sample list.
#[derive(Debug)]
pub(crate) struct Instance {
    pub iid: u64,
    pub key: Vec<u8>,
    pub state: InstanceState,
    /// True until the first read/take that returns a sample of this
    /// instance; re-set when the instance comes back from a not-alive
    /// state.
    pub view_new: bool,
    pub live_writers: Vec<Guid>,
    pub samples: VecDeque<RhcSample>,
    pub disposed_generation: u32,
    pub no_writers_generation: u32,
    /// Newest source timestamp seen (BY_SOURCE_TIMESTAMP filtering).
    pub latest_source_timestamp: Time,
    /// Pending auto-purge deadline, armed while not alive.
    pub purge_at: Option<MonotonicTime>,
}

impl Instance {
    pub fn new(iid: u64, key: Vec<u8>) -> Self {
        Instance {
            iid,
            key,
            state: InstanceState::Alive,
            view_new: true,
            live_writers: Vec::new(),
            samples: VecDeque::new(),
            disposed_generation: 0,
            no_writers_generation: 0,
            latest_source_timestamp: Time::INVALID,
            purge_at: None,
        }
    }

    pub fn view_state(&self) -> ViewState {
        if self.view_new {
            ViewState::New
        } else {
            ViewState::NotNew
        }
    }

    pub fn generation(&self) -> u32 {
        self.disposed_generation + self.no_writers_generation
    }

    /// Number of valid-data samples (sentinels do not count toward
    /// history or resource limits).
    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_valid()).count()
    }

    /// Register a writer as live for this instance.
    pub fn register_writer(&mut self, guid: Guid) {
        if !self.live_writers.contains(&guid) {
            self.live_writers.push(guid);
        }
    }

    /// Remove a writer; returns true if it was registered.
    pub fn unregister_writer(&mut self, guid: Guid) -> bool {
        if let Some(pos) = self.live_writers.iter().position(|g| *g == guid) {
            self.live_writers.remove(pos);
            true
        } else {
            false
        }
    }

    /// Transition back to ALIVE on a data sample. Returns true if the
    /// instance was not alive (generation bump + NEW view).
    pub fn revive(&mut self) -> bool {
        match self.state {
            InstanceState::Alive => false,
            InstanceState::NotAliveDisposed => {
                self.disposed_generation += 1;
                self.state = InstanceState::Alive;
                self.view_new = true;
                self.purge_at = None;
                true
            }
            InstanceState::NotAliveNoWriters => {
                self.no_writers_generation += 1;
                self.state = InstanceState::Alive;
                self.view_new = true;
                self.purge_at = None;
                true
            }
        }
    }

    /// Drop the oldest valid sample (KEEP_LAST eviction).
    pub fn evict_oldest_valid(&mut self) -> bool {
        if let Some(pos) = self.samples.iter().position(RhcSample::is_valid) {
            self.samples.remove(pos);
            true
        } else {
            false
        }
    }

    /// Empty and not alive: the record can be reclaimed.
    pub fn is_reclaimable(&self) -> bool {
        self.samples.is_empty() && self.state != InstanceState::Alive
    }
}
