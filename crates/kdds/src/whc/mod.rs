// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Writer history cache (whc).
//!
//! Samples get monotonically increasing sequence numbers starting at 1;
//! disposes and unregisters are sentinels in the same sequence space. A
//! sample is retained until every matched reliable reader has
//! acknowledged it, its lifespan expired, or the writer is deleted -
//! except that a transient-local writer additionally keeps the last
//! history-depth samples of each instance for late-joining readers.
//!
//! A reliable `write` that hits the resource limit blocks up to
//! `reliability.max_blocking_time` for acknowledgments to free space;
//! closing the cache (writer deletion) wakes all blocked writers with
//! `AlreadyDeleted`.

use crate::core::handles::Handle;
use crate::core::iid::iid_generator;
use crate::core::retcode::{ReturnCode, Result};
use crate::core::time::{MonotonicTime, Time};
use crate::qos::reliability::History;
use crate::qos::resource_limits::{ResourceLimits, LENGTH_UNLIMITED};
use crate::qos::{Durability, Lifespan, Qos, Reliability};
use crate::rhc::IncomingKind;
use crate::stats::{Counter, LengthTimeMeter};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One entry in the writer history.
#[derive(Debug)]
pub struct WhcSample {
    pub seq: u64,
    pub kind: IncomingKind,
    pub payload: Option<Arc<[u8]>>,
    pub key: Vec<u8>,
    pub source_timestamp: Time,
    /// Wall-clock lifespan expiry.
    pub expiry: Time,
}

impl WhcSample {
    pub fn is_valid(&self) -> bool {
        self.payload.is_some()
    }
}

/// Cache-relevant slice of the writer QoS.
#[derive(Debug, Clone)]
pub struct WriterCacheConfig {
    pub history: History,
    pub resource_limits: ResourceLimits,
    pub durability: Durability,
    pub lifespan: Lifespan,
    pub reliability: Reliability,
}

impl WriterCacheConfig {
    #[must_use]
    pub fn from_qos(qos: &Qos) -> Self {
        WriterCacheConfig {
            history: qos.history,
            resource_limits: qos.resource_limits,
            durability: qos.durability,
            lifespan: qos.lifespan,
            reliability: qos.reliability,
        }
    }
}

#[derive(Debug)]
struct ReaderTrack {
    reliable: bool,
    acked: u64,
}

#[derive(Debug)]
struct WriterInstanceRec {
    iid: u64,
    registered: bool,
}

struct WhcState {
    next_seq: u64,
    samples: VecDeque<Arc<WhcSample>>,
    instances: HashMap<Vec<u8>, WriterInstanceRec>,
    readers: HashMap<Handle, ReaderTrack>,
    closed: bool,
}

/// The writer history cache.
pub struct WriterCache {
    config: WriterCacheConfig,
    state: Mutex<WhcState>,
    space: Condvar,
    /// Valid samples written.
    pub samples_written: Counter,
    /// Occupancy integral (retained samples over time).
    pub occupancy: LengthTimeMeter,
}

impl WriterCache {
    #[must_use]
    pub fn new(config: WriterCacheConfig) -> Self {
        WriterCache {
            config,
            state: Mutex::new(WhcState {
                next_seq: 1,
                samples: VecDeque::new(),
                instances: HashMap::new(),
                readers: HashMap::new(),
                closed: false,
            }),
            space: Condvar::new(),
            samples_written: Counter::default(),
            occupancy: LengthTimeMeter::new(),
        }
    }

    /// Append a sample, assigning its sequence number.
    ///
    /// Blocks up to `deadline` when the cache is full and the writer is
    /// reliable; a best-effort writer gets `OutOfResources` immediately.
    pub fn insert(
        &self,
        kind: IncomingKind,
        payload: Option<Arc<[u8]>>,
        key: Vec<u8>,
        source_timestamp: Time,
        deadline: MonotonicTime,
    ) -> Result<Arc<WhcSample>> {
        let is_valid = payload.is_some();
        let mut guard = self.state.lock();

        if is_valid {
            loop {
                if guard.closed {
                    return Err(ReturnCode::AlreadyDeleted);
                }
                Self::cleanup(&self.config, &mut guard, Time::now());
                if !self.over_limit(&guard, &key) {
                    break;
                }
                if let History::KeepLast(depth) = self.config.history {
                    // KEEP_LAST overwrites: drop the oldest sample of this
                    // instance instead of blocking; fall back to the
                    // globally oldest when another instance fills the cache.
                    Self::evict_instance_oldest(&mut guard, &key, depth);
                    if self.over_limit(&guard, &key) {
                        let st = &mut *guard;
                        if let Some(pos) = st.samples.iter().position(|s| s.is_valid()) {
                            st.samples.remove(pos);
                        }
                    }
                    break;
                }
                if !self.config.reliability.is_reliable() {
                    return Err(ReturnCode::OutOfResources);
                }
                if deadline.has_passed() {
                    return Err(ReturnCode::Timeout);
                }
                let remaining = deadline.remaining();
                if remaining.is_infinite() {
                    self.space.wait(&mut guard);
                } else {
                    let _ = self
                        .space
                        .wait_for(&mut guard, remaining.to_std());
                }
            }
        } else if guard.closed {
            return Err(ReturnCode::AlreadyDeleted);
        }

        let st = &mut *guard;
        let seq = st.next_seq;
        st.next_seq += 1;

        // Instance bookkeeping in the writer's own key space.
        let rec = st.instances.entry(key.clone()).or_insert_with(|| WriterInstanceRec {
            iid: iid_generator().next(),
            registered: false,
        });
        match kind {
            IncomingKind::Data | IncomingKind::Dispose => rec.registered = true,
            IncomingKind::Unregister | IncomingKind::DisposeUnregister => rec.registered = false,
        }

        let expiry = if self.config.lifespan.is_infinite() {
            Time(i64::MAX)
        } else {
            source_timestamp.add_duration(self.config.lifespan.duration)
        };
        let sample = Arc::new(WhcSample {
            seq,
            kind,
            payload,
            key,
            source_timestamp,
            expiry,
        });
        st.samples.push_back(Arc::clone(&sample));
        if is_valid {
            self.samples_written.incr();
        }
        self.occupancy.set(st.samples.len() as u64);
        Ok(sample)
    }

    /// Register a key in the writer's instance space, returning the
    /// writer-local instance handle.
    pub fn register_instance(&self, key: Vec<u8>) -> u64 {
        let mut st = self.state.lock();
        let rec = st.instances.entry(key).or_insert_with(|| WriterInstanceRec {
            iid: iid_generator().next(),
            registered: false,
        });
        rec.registered = true;
        rec.iid
    }

    /// Look up the instance handle for a key, if ever registered/written.
    #[must_use]
    pub fn lookup_instance(&self, key: &[u8]) -> Option<u64> {
        self.state.lock().instances.get(key).map(|rec| rec.iid)
    }

    /// Keys of all currently registered instances (for autodispose on
    /// writer deletion).
    #[must_use]
    pub fn registered_keys(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .instances
            .iter()
            .filter(|(_, rec)| rec.registered)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Track a newly matched reader. When `deliver_history` (durability
    /// above volatile on both sides) the reader starts before the oldest
    /// retained sample and the returned list replays the history.
    pub fn add_reader(
        &self,
        reader: Handle,
        reliable: bool,
        deliver_history: bool,
    ) -> Vec<Arc<WhcSample>> {
        let mut st = self.state.lock();
        let start = if deliver_history { 0 } else { st.next_seq - 1 };
        st.readers.insert(
            reader,
            ReaderTrack {
                reliable,
                acked: start,
            },
        );
        if deliver_history {
            st.samples.iter().cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// Stop tracking a reader (unmatch or deletion); releases retention.
    pub fn remove_reader(&self, reader: Handle) {
        let mut guard = self.state.lock();
        guard.readers.remove(&reader);
        Self::cleanup(&self.config, &mut guard, Time::now());
        self.occupancy.set(guard.samples.len() as u64);
        self.space.notify_all();
    }

    /// Record an acknowledgment from a reader up to `seq` inclusive.
    pub fn ack(&self, reader: Handle, seq: u64) {
        let mut guard = self.state.lock();
        if let Some(track) = guard.readers.get_mut(&reader) {
            if seq > track.acked {
                track.acked = seq;
            }
        }
        Self::cleanup(&self.config, &mut guard, Time::now());
        self.occupancy.set(guard.samples.len() as u64);
        self.space.notify_all();
    }

    /// Samples a reader has not acknowledged yet, in sequence order.
    #[must_use]
    pub fn pending_for(&self, reader: Handle) -> Vec<Arc<WhcSample>> {
        let st = self.state.lock();
        let Some(track) = st.readers.get(&reader) else {
            return Vec::new();
        };
        st.samples
            .iter()
            .filter(|s| s.seq > track.acked)
            .cloned()
            .collect()
    }

    /// Highest assigned sequence number (0 before the first write).
    #[must_use]
    pub fn last_seq(&self) -> u64 {
        self.state.lock().next_seq - 1
    }

    /// Block until every matched reliable reader acknowledged everything
    /// written so far, or the deadline passes.
    pub fn wait_for_acks(&self, deadline: MonotonicTime) -> Result<()> {
        let mut guard = self.state.lock();
        let target = guard.next_seq - 1;
        loop {
            if guard.closed {
                return Err(ReturnCode::AlreadyDeleted);
            }
            let all_acked = guard
                .readers
                .values()
                .filter(|t| t.reliable)
                .all(|t| t.acked >= target);
            if all_acked {
                return Ok(());
            }
            if deadline.has_passed() {
                return Err(ReturnCode::Timeout);
            }
            let remaining = deadline.remaining();
            if remaining.is_infinite() {
                self.space.wait(&mut guard);
            } else {
                let _ = self.space.wait_for(&mut guard, remaining.to_std());
            }
        }
    }

    /// Mark the cache closed and wake every blocked thread.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.space.notify_all();
    }

    /// Retained sample count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn over_limit(&self, st: &WhcState, _key: &[u8]) -> bool {
        let limits = &self.config.resource_limits;
        let valid = st.samples.iter().filter(|s| s.is_valid()).count();
        if limits.max_samples != LENGTH_UNLIMITED && valid >= limits.max_samples {
            return true;
        }
        if limits.max_samples_per_instance != LENGTH_UNLIMITED {
            let per_inst = st
                .samples
                .iter()
                .filter(|s| s.is_valid() && s.key == _key)
                .count();
            if per_inst >= limits.max_samples_per_instance {
                return true;
            }
        }
        false
    }

    fn evict_instance_oldest(st: &mut WhcState, key: &[u8], depth: usize) {
        let count = st
            .samples
            .iter()
            .filter(|s| s.is_valid() && s.key == key)
            .count();
        if count < depth {
            return;
        }
        if let Some(pos) = st
            .samples
            .iter()
            .position(|s| s.is_valid() && s.key == key)
        {
            st.samples.remove(pos);
        }
    }

    /// Drop releasable samples from the front of the history.
    ///
    /// A sample is releasable when its lifespan expired, or when every
    /// reliable reader acknowledged it and it is not part of the
    /// transient-local retention window.
    fn cleanup(config: &WriterCacheConfig, st: &mut WhcState, now: Time) {
        let min_acked = st
            .readers
            .values()
            .filter(|t| t.reliable)
            .map(|t| t.acked)
            .min()
            .unwrap_or(u64::MAX);

        // Transient-local retention: the newest history-depth valid
        // samples per instance stay.
        let mut keep: HashMap<&[u8], usize> = HashMap::new();
        let retained_depth = if config.durability.keeps_history() {
            match config.history {
                History::KeepLast(depth) => depth,
                History::KeepAll => usize::MAX,
            }
        } else {
            0
        };
        let mut protected: Vec<bool> = vec![false; st.samples.len()];
        if retained_depth > 0 {
            for (i, sample) in st.samples.iter().enumerate().rev() {
                if !sample.is_valid() {
                    continue;
                }
                let seen = keep.entry(sample.key.as_slice()).or_insert(0);
                if *seen < retained_depth {
                    *seen += 1;
                    protected[i] = true;
                }
            }
        }

        let mut idx = 0usize;
        while idx < st.samples.len() {
            let sample = &st.samples[idx];
            let expired = sample.expiry <= now;
            let acked = sample.seq <= min_acked;
            if expired || (acked && !protected[idx]) {
                st.samples.remove(idx);
                protected.remove(idx);
            } else {
                idx += 1;
            }
        }
    }
}
