// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Reader history cache: instance-keyed bounded sample store.
//!
//! Ingest (`store`) runs the full pipeline: duplicate/gap detection per
//! writer, instance lookup or creation under `max_instances`, the
//! instance state machine (ALIVE / NOT_ALIVE_DISPOSED /
//! NOT_ALIVE_NO_WRITERS with generation counts), destination-order
//! filtering, history/resource-limit admission, and finally condition
//! re-evaluation and observer notification - all while the cache lock is
//! held, so waitsets never miss a wake-up.
//!
//! `read` copies and marks READ; `take` removes. Both filter on the
//! (sample, view, instance) state triple and return samples in per-
//! instance order; across instances the lexicographic key order is used.
//! Taking the last sample of a not-alive instance reclaims the instance
//! record.

use super::condition::ReadConditionCore;
use super::instance::{Instance, RhcSample};
use super::state::{InstanceState, SampleInfo, SampleState, StateMask};
use crate::core::guid::Guid;
use crate::core::iid::iid_generator;
use crate::core::time::{Duration, MonotonicTime, Time};
use crate::qos::lifecycle::ReaderDataLifecycle;
use crate::qos::ordering::DestinationOrderKind;
use crate::qos::reliability::History;
use crate::qos::resource_limits::{ResourceLimits, LENGTH_UNLIMITED};
use crate::qos::Qos;
use crate::stats::{Counter, LengthTimeMeter};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

/// Why a sample was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreReject {
    /// `resource_limits.max_instances` reached.
    MaxInstances,
    /// `resource_limits.max_samples` reached.
    MaxSamples,
    /// `resource_limits.max_samples_per_instance` reached.
    MaxSamplesPerInstance,
}

/// Hooks back into the entity layer, invoked while the cache lock is
/// held. Implementations must only touch leaf-level state (status bits,
/// condition signals, dispatch queues).
pub trait CacheObserver: Send + Sync {
    /// New sample (or state-transition sentinel) available.
    fn on_data_available(&self);
    /// A gap in a writer's sequence numbers was detected.
    fn on_sample_lost(&self, count: u32);
    /// A sample was refused for resource reasons.
    fn on_sample_rejected(&self, reason: StoreReject, instance_handle: u64);
}

/// What an incoming sample announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingKind {
    /// Plain data sample.
    Data,
    /// Instance disposed (payload optional).
    Dispose,
    /// Writer unregistered the instance (payload optional).
    Unregister,
    /// Dispose and unregister in one step.
    DisposeUnregister,
}

/// A sample as handed over by the delivery path.
#[derive(Debug, Clone)]
pub struct IncomingSample {
    pub kind: IncomingKind,
    pub payload: Option<Arc<[u8]>>,
    pub key: Vec<u8>,
    pub writer_guid: Guid,
    pub seq: u64,
    pub source_timestamp: Time,
    /// Wall-clock lifespan expiry (`Time(i64::MAX)` = never).
    pub expiry: Time,
}

/// Cache-relevant slice of the reader QoS.
#[derive(Debug, Clone)]
pub struct ReaderCacheConfig {
    pub history: History,
    pub resource_limits: ResourceLimits,
    pub destination_order: DestinationOrderKind,
    pub lifecycle: ReaderDataLifecycle,
}

impl ReaderCacheConfig {
    #[must_use]
    pub fn from_qos(qos: &Qos) -> Self {
        ReaderCacheConfig {
            history: qos.history,
            resource_limits: qos.resource_limits,
            destination_order: qos.destination_order.kind,
            lifecycle: qos.reader_data_lifecycle,
        }
    }
}

/// Serialized sample plus metadata, as returned by read/take.
#[derive(Debug, Clone)]
pub struct RawSample {
    pub payload: Option<Arc<[u8]>>,
    pub info: SampleInfo,
}

struct CacheState {
    instances: BTreeMap<Vec<u8>, Instance>,
    iid_index: HashMap<u64, Vec<u8>>,
    writer_floor: HashMap<Guid, u64>,
    valid_total: usize,
}

impl CacheState {
    fn remove_instance(&mut self, key: &[u8]) {
        if let Some(inst) = self.instances.remove(key) {
            self.valid_total -= inst.valid_count();
            self.iid_index.remove(&inst.iid);
        }
    }
}

/// The reader history cache.
pub struct ReaderCache {
    config: ReaderCacheConfig,
    state: Mutex<CacheState>,
    conditions: Mutex<Vec<Weak<ReadConditionCore>>>,
    observer: Mutex<Option<Arc<dyn CacheObserver>>>,
    /// Valid samples accepted.
    pub samples_received: Counter,
    /// Gap-detected losses.
    pub samples_lost: Counter,
    /// Resource-limit rejections.
    pub samples_rejected: Counter,
    /// Occupancy integral (valid samples over time).
    pub occupancy: LengthTimeMeter,
}

impl ReaderCache {
    #[must_use]
    pub fn new(config: ReaderCacheConfig) -> Self {
        ReaderCache {
            config,
            state: Mutex::new(CacheState {
                instances: BTreeMap::new(),
                iid_index: HashMap::new(),
                writer_floor: HashMap::new(),
                valid_total: 0,
            }),
            conditions: Mutex::new(Vec::new()),
            observer: Mutex::new(None),
            samples_received: Counter::default(),
            samples_lost: Counter::default(),
            samples_rejected: Counter::default(),
            occupancy: LengthTimeMeter::new(),
        }
    }

    /// Install the entity-layer observer (status bits, listener queue).
    pub fn set_observer(&self, observer: Arc<dyn CacheObserver>) {
        *self.observer.lock() = Some(observer);
    }

    fn observer(&self) -> Option<Arc<dyn CacheObserver>> {
        self.observer.lock().clone()
    }

    /// Attach a read/query condition for re-evaluation on every change.
    pub fn attach_condition(&self, cond: &Arc<ReadConditionCore>) {
        let mut conds = self.conditions.lock();
        conds.retain(|weak| weak.upgrade().is_some());
        conds.push(Arc::downgrade(cond));
        drop(conds);
        // Initial evaluation so a pre-populated cache triggers immediately.
        let guard = self.state.lock();
        cond.set_trigger(Self::has_matching(&guard, cond.masks(), Some(cond)));
    }

    /// Detach a condition by id.
    pub fn detach_condition(&self, id: u64) {
        self.conditions
            .lock()
            .retain(|weak| weak.upgrade().is_some_and(|c| c.id() != id));
    }

    /// Ingest one sample. `Err` means the transport may retry (reliable)
    /// or drop (best effort); no sample was stored.
    pub fn store(&self, incoming: IncomingSample) -> Result<(), StoreReject> {
        let now_wall = Time::now();
        let now_mono = MonotonicTime::now();
        let mut guard = self.state.lock();
        let st = &mut *guard;
        Self::drop_expired(st, now_wall);

        // Already past its lifespan: silently gone.
        if incoming.expiry <= now_wall {
            return Ok(());
        }

        // Per-writer duplicate and gap detection.
        let mut lost: u32 = 0;
        if let Some(&floor) = st.writer_floor.get(&incoming.writer_guid) {
            if incoming.seq <= floor {
                return Ok(());
            }
            lost = (incoming.seq - floor - 1) as u32;
        }

        let is_valid_data = incoming.payload.is_some();
        let key = incoming.key.clone();

        // Instance lookup / creation.
        let created = if st.instances.contains_key(&key) {
            false
        } else {
            // Unregister for an unknown instance carries no information.
            if !is_valid_data && incoming.kind == IncomingKind::Unregister {
                return Ok(());
            }
            if st.instances.len() >= self.config.resource_limits.max_instances {
                self.reject(StoreReject::MaxInstances, 0);
                return Err(StoreReject::MaxInstances);
            }
            let iid = iid_generator().next();
            st.instances.insert(key.clone(), Instance::new(iid, key.clone()));
            st.iid_index.insert(iid, key.clone());
            true
        };

        // Destination order: BY_SOURCE_TIMESTAMP drops stale arrivals.
        {
            let inst = &st.instances[&key];
            if self.config.destination_order == DestinationOrderKind::BySourceTimestamp
                && inst.latest_source_timestamp != Time::INVALID
                && incoming.source_timestamp < inst.latest_source_timestamp
            {
                return Ok(());
            }
        }

        // Admission control for valid data (sentinels are metadata).
        if is_valid_data {
            let inst_valid = st.instances[&key].valid_count();
            let iid = st.instances[&key].iid;
            let limits = &self.config.resource_limits;
            let mut evict = false;
            let rejection = match self.config.history {
                History::KeepLast(depth) => {
                    if inst_valid >= depth {
                        evict = true;
                        None
                    } else if limits.max_samples != LENGTH_UNLIMITED
                        && st.valid_total >= limits.max_samples
                    {
                        if inst_valid > 0 {
                            evict = true;
                            None
                        } else {
                            Some(StoreReject::MaxSamples)
                        }
                    } else {
                        None
                    }
                }
                History::KeepAll => {
                    if limits.max_samples_per_instance != LENGTH_UNLIMITED
                        && inst_valid >= limits.max_samples_per_instance
                    {
                        Some(StoreReject::MaxSamplesPerInstance)
                    } else if limits.max_samples != LENGTH_UNLIMITED
                        && st.valid_total >= limits.max_samples
                    {
                        Some(StoreReject::MaxSamples)
                    } else {
                        None
                    }
                }
            };
            if let Some(reason) = rejection {
                if created {
                    st.remove_instance(&key);
                }
                self.reject(reason, iid);
                return Err(reason);
            }
            if evict {
                let inst = st.instances.get_mut(&key).expect("instance exists");
                if inst.evict_oldest_valid() {
                    st.valid_total -= 1;
                }
            }
        }

        // Instance state machine.
        let appended = {
            let inst = st.instances.get_mut(&key).expect("instance exists");
            let prev_state = inst.state;
            if is_valid_data {
                inst.revive();
                inst.register_writer(incoming.writer_guid);
            }
            match incoming.kind {
                IncomingKind::Data => {}
                IncomingKind::Dispose => {
                    inst.state = InstanceState::NotAliveDisposed;
                    inst.purge_at = arm_purge(
                        self.config.lifecycle.autopurge_disposed_samples_delay,
                        now_mono,
                    );
                }
                IncomingKind::Unregister => {
                    inst.unregister_writer(incoming.writer_guid);
                    if inst.state == InstanceState::Alive && inst.live_writers.is_empty() {
                        inst.state = InstanceState::NotAliveNoWriters;
                        inst.purge_at = arm_purge(
                            self.config.lifecycle.autopurge_nowriter_samples_delay,
                            now_mono,
                        );
                    }
                }
                IncomingKind::DisposeUnregister => {
                    inst.state = InstanceState::NotAliveDisposed;
                    inst.unregister_writer(incoming.writer_guid);
                    inst.purge_at = arm_purge(
                        self.config.lifecycle.autopurge_disposed_samples_delay,
                        now_mono,
                    );
                }
            }
            if incoming.source_timestamp > inst.latest_source_timestamp {
                inst.latest_source_timestamp = incoming.source_timestamp;
            }

            // Append a sample when there is data, or a sentinel when the
            // state actually changed.
            if is_valid_data || inst.state != prev_state {
                inst.samples.push_back(RhcSample {
                    payload: incoming.payload.clone(),
                    writer_guid: incoming.writer_guid,
                    seq: incoming.seq,
                    source_timestamp: incoming.source_timestamp,
                    reception_timestamp: now_wall,
                    expiry: incoming.expiry,
                    read: false,
                    disposed_generation: inst.disposed_generation,
                    no_writers_generation: inst.no_writers_generation,
                });
                true
            } else {
                false
            }
        };

        st.writer_floor.insert(incoming.writer_guid, incoming.seq);
        if is_valid_data {
            st.valid_total += 1;
            self.samples_received.incr();
        }
        self.occupancy.set(st.valid_total as u64);

        if lost > 0 {
            self.samples_lost.add(u64::from(lost));
            if let Some(obs) = self.observer() {
                obs.on_sample_lost(lost);
            }
        }
        if appended {
            if let Some(obs) = self.observer() {
                obs.on_data_available();
            }
        }
        self.reevaluate_conditions(st);
        Ok(())
    }

    fn reject(&self, reason: StoreReject, iid: u64) {
        self.samples_rejected.incr();
        if let Some(obs) = self.observer() {
            obs.on_sample_rejected(reason, iid);
        }
    }

    /// Non-destructive access: copies samples and marks them READ.
    pub fn read(&self, max: usize, mask: StateMask) -> Vec<RawSample> {
        self.access(max, mask, None, None, false)
    }

    /// Destructive access: removes the returned samples.
    pub fn take(&self, max: usize, mask: StateMask) -> Vec<RawSample> {
        self.access(max, mask, None, None, true)
    }

    /// Read samples selected by a read/query condition.
    pub fn read_with_condition(&self, max: usize, cond: &ReadConditionCore) -> Vec<RawSample> {
        self.access(max, cond.masks(), Some(cond), None, false)
    }

    /// Take samples selected by a read/query condition.
    pub fn take_with_condition(&self, max: usize, cond: &ReadConditionCore) -> Vec<RawSample> {
        self.access(max, cond.masks(), Some(cond), None, true)
    }

    /// Read samples of a single instance.
    pub fn read_instance(&self, iid: u64, max: usize, mask: StateMask) -> Vec<RawSample> {
        self.access(max, mask, None, Some(iid), false)
    }

    /// Take samples of a single instance.
    pub fn take_instance(&self, iid: u64, max: usize, mask: StateMask) -> Vec<RawSample> {
        self.access(max, mask, None, Some(iid), true)
    }

    fn access(
        &self,
        max: usize,
        mask: StateMask,
        cond: Option<&ReadConditionCore>,
        only_iid: Option<u64>,
        take: bool,
    ) -> Vec<RawSample> {
        if max == 0 {
            return Vec::new();
        }
        let now_wall = Time::now();
        let mut guard = self.state.lock();
        let st = &mut *guard;
        Self::drop_expired(st, now_wall);

        // Selection pass: (key, sample index) in key order, per-instance
        // sample order.
        let mut picked: Vec<(Vec<u8>, usize)> = Vec::new();
        'outer: for (key, inst) in &st.instances {
            if let Some(iid) = only_iid {
                if inst.iid != iid {
                    continue;
                }
            }
            if !mask.view.matches(inst.view_state()) || !mask.instance.matches(inst.state) {
                continue;
            }
            for (i, sample) in inst.samples.iter().enumerate() {
                if picked.len() >= max {
                    break 'outer;
                }
                let sample_state = if sample.read {
                    SampleState::Read
                } else {
                    SampleState::NotRead
                };
                if !mask.sample.matches(sample_state) {
                    continue;
                }
                if let Some(c) = cond {
                    if !c.accepts_payload(sample.payload.as_deref()) {
                        continue;
                    }
                }
                picked.push((key.clone(), i));
            }
        }
        if picked.is_empty() {
            return Vec::new();
        }

        // Build results while states are still untouched.
        let mut out: Vec<RawSample> = Vec::with_capacity(picked.len());
        for (key, idx) in &picked {
            let inst = &st.instances[key];
            let sample = &inst.samples[*idx];
            out.push(RawSample {
                payload: sample.payload.clone(),
                info: SampleInfo {
                    sample_state: if sample.read {
                        SampleState::Read
                    } else {
                        SampleState::NotRead
                    },
                    view_state: inst.view_state(),
                    instance_state: inst.state,
                    valid_data: sample.is_valid(),
                    source_timestamp: sample.source_timestamp,
                    reception_timestamp: sample.reception_timestamp,
                    writer_guid: sample.writer_guid,
                    sequence_number: sample.seq,
                    instance_handle: inst.iid,
                    disposed_generation_count: sample.disposed_generation,
                    no_writers_generation_count: sample.no_writers_generation,
                    sample_rank: 0,
                    generation_rank: 0,
                    absolute_generation_rank: 0,
                },
            });
        }
        Self::fill_ranks(st, &picked, &mut out);

        // Mutation pass.
        if take {
            let mut by_key: BTreeMap<Vec<u8>, Vec<usize>> = BTreeMap::new();
            for (key, idx) in &picked {
                by_key.entry(key.clone()).or_default().push(*idx);
            }
            for (key, indices) in by_key {
                let mut removed_valid = 0usize;
                let mut reclaim = false;
                if let Some(inst) = st.instances.get_mut(&key) {
                    for idx in indices.iter().rev() {
                        if let Some(sample) = inst.samples.remove(*idx) {
                            if sample.is_valid() {
                                removed_valid += 1;
                            }
                        }
                    }
                    inst.view_new = false;
                    reclaim = inst.is_reclaimable();
                }
                st.valid_total -= removed_valid;
                if reclaim {
                    st.remove_instance(&key);
                }
            }
        } else {
            for (key, idx) in &picked {
                let inst = st.instances.get_mut(key).expect("picked instance exists");
                inst.samples[*idx].read = true;
                inst.view_new = false;
            }
        }

        self.occupancy.set(st.valid_total as u64);
        self.reevaluate_conditions(st);
        out
    }

    /// DDS sample-info ranks, relative to the returned collection.
    fn fill_ranks(st: &CacheState, picked: &[(Vec<u8>, usize)], out: &mut [RawSample]) {
        let mut groups: HashMap<&[u8], Vec<usize>> = HashMap::new();
        for (pos, (key, _)) in picked.iter().enumerate() {
            groups.entry(key.as_slice()).or_default().push(pos);
        }
        for (key, positions) in groups {
            let inst = &st.instances[key];
            let newest_gen = positions
                .iter()
                .map(|&p| {
                    out[p].info.disposed_generation_count + out[p].info.no_writers_generation_count
                })
                .max()
                .unwrap_or(0);
            let count = positions.len();
            for (i, &p) in positions.iter().enumerate() {
                let info = &mut out[p].info;
                info.sample_rank = (count - 1 - i) as u32;
                let gen = info.disposed_generation_count + info.no_writers_generation_count;
                info.generation_rank = newest_gen - gen;
                info.absolute_generation_rank = inst.generation() - gen;
            }
        }
    }

    /// A writer went away without unregistering: drop it from every
    /// instance; the last writer's departure moves an instance to
    /// NOT_ALIVE_NO_WRITERS.
    pub fn writer_departed(&self, guid: Guid) {
        let now_wall = Time::now();
        let now_mono = MonotonicTime::now();
        let mut guard = self.state.lock();
        let st = &mut *guard;
        let mut transitioned = false;
        for inst in st.instances.values_mut() {
            if inst.unregister_writer(guid)
                && inst.state == InstanceState::Alive
                && inst.live_writers.is_empty()
            {
                inst.state = InstanceState::NotAliveNoWriters;
                inst.purge_at = arm_purge(
                    self.config.lifecycle.autopurge_nowriter_samples_delay,
                    now_mono,
                );
                inst.samples.push_back(RhcSample {
                    payload: None,
                    writer_guid: guid,
                    seq: 0,
                    source_timestamp: now_wall,
                    reception_timestamp: now_wall,
                    expiry: Time(i64::MAX),
                    read: false,
                    disposed_generation: inst.disposed_generation,
                    no_writers_generation: inst.no_writers_generation,
                });
                transitioned = true;
            }
        }
        st.writer_floor.remove(&guid);
        if transitioned {
            if let Some(obs) = self.observer() {
                obs.on_data_available();
            }
            self.reevaluate_conditions(st);
        }
    }

    /// Reclaim not-alive instances whose auto-purge deadline has passed.
    pub fn purge_expired(&self, now: MonotonicTime) -> bool {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        let expired: Vec<Vec<u8>> = st
            .instances
            .iter()
            .filter(|(_, inst)| inst.purge_at.is_some_and(|at| at <= now))
            .map(|(key, _)| key.clone())
            .collect();
        if expired.is_empty() {
            return false;
        }
        for key in expired {
            st.remove_instance(&key);
        }
        self.occupancy.set(st.valid_total as u64);
        self.reevaluate_conditions(st);
        true
    }

    /// Earliest armed auto-purge deadline, if any.
    #[must_use]
    pub fn next_purge_deadline(&self) -> Option<MonotonicTime> {
        self.state
            .lock()
            .instances
            .values()
            .filter_map(|inst| inst.purge_at)
            .min()
    }

    /// Resolve an instance handle from serialized key bytes.
    #[must_use]
    pub fn lookup_instance(&self, key: &[u8]) -> Option<u64> {
        self.state.lock().instances.get(key).map(|inst| inst.iid)
    }

    /// True if any sample matches the mask (DATA_AVAILABLE style check).
    #[must_use]
    pub fn matches_mask(&self, mask: StateMask) -> bool {
        let guard = self.state.lock();
        Self::has_matching(&guard, mask, None)
    }

    /// Number of valid samples in the cache.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.state.lock().valid_total
    }

    /// Number of instance records.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.state.lock().instances.len()
    }

    fn has_matching(st: &CacheState, mask: StateMask, cond: Option<&ReadConditionCore>) -> bool {
        for inst in st.instances.values() {
            if !mask.view.matches(inst.view_state()) || !mask.instance.matches(inst.state) {
                continue;
            }
            for sample in &inst.samples {
                let sample_state = if sample.read {
                    SampleState::Read
                } else {
                    SampleState::NotRead
                };
                if !mask.sample.matches(sample_state) {
                    continue;
                }
                if let Some(c) = cond {
                    if !c.accepts_payload(sample.payload.as_deref()) {
                        continue;
                    }
                }
                return true;
            }
        }
        false
    }

    fn reevaluate_conditions(&self, st: &CacheState) {
        let mut conds = self.conditions.lock();
        conds.retain(|weak| weak.upgrade().is_some());
        for weak in conds.iter() {
            if let Some(cond) = weak.upgrade() {
                cond.set_trigger(Self::has_matching(st, cond.masks(), Some(&cond)));
            }
        }
    }

    /// Remove samples whose lifespan expired.
    fn drop_expired(st: &mut CacheState, now: Time) {
        let mut removed = 0usize;
        let mut reclaim: Vec<Vec<u8>> = Vec::new();
        for (key, inst) in st.instances.iter_mut() {
            let before = inst.valid_count();
            inst.samples.retain(|s| !(s.is_valid() && s.expiry <= now));
            removed += before - inst.valid_count();
            if inst.is_reclaimable() {
                reclaim.push(key.clone());
            }
        }
        st.valid_total -= removed;
        for key in reclaim {
            st.remove_instance(&key);
        }
    }
}

impl ReadConditionCore {
    /// The condition's combined state mask.
    #[must_use]
    pub fn masks(&self) -> StateMask {
        StateMask::new(self.sample_mask, self.view_mask, self.instance_mask)
    }
}

fn arm_purge(delay: Duration, now: MonotonicTime) -> Option<MonotonicTime> {
    if delay.is_infinite() {
        None
    } else {
        Some(MonotonicTime(now.nanos().saturating_add(delay.nanos())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::guid::GuidKind;
    use crate::rhc::state::{InstanceStateMask, SampleStateMask, ViewState, ViewStateMask};

    fn wguid(n: u32) -> Guid {
        Guid::new([9; 12], n, GuidKind::Writer)
    }

    fn data(key: u8, seq: u64, byte: u8) -> IncomingSample {
        IncomingSample {
            kind: IncomingKind::Data,
            payload: Some(Arc::from(vec![byte].into_boxed_slice())),
            key: vec![key],
            writer_guid: wguid(1),
            seq,
            source_timestamp: Time::now(),
            expiry: Time(i64::MAX),
        }
    }

    fn dispose(key: u8, seq: u64) -> IncomingSample {
        IncomingSample {
            kind: IncomingKind::Dispose,
            payload: None,
            key: vec![key],
            writer_guid: wguid(1),
            seq,
            source_timestamp: Time::now(),
            expiry: Time(i64::MAX),
        }
    }

    fn default_cache() -> ReaderCache {
        ReaderCache::new(ReaderCacheConfig::from_qos(&Qos::default().keep_all()))
    }

    #[test]
    fn test_store_then_take_roundtrip() {
        let cache = default_cache();
        cache.store(data(1, 1, 0xaa)).expect("store");
        let taken = cache.take(10, StateMask::ANY);
        assert_eq!(taken.len(), 1);
        let sample = &taken[0];
        assert!(sample.info.valid_data);
        assert_eq!(sample.info.sample_state, SampleState::NotRead);
        assert_eq!(sample.info.view_state, ViewState::New);
        assert_eq!(sample.info.instance_state, InstanceState::Alive);
        assert_eq!(sample.payload.as_deref(), Some(&[0xaa][..]));
        // take removed it
        assert!(cache.take(10, StateMask::ANY).is_empty());
    }

    #[test]
    fn test_read_marks_read_keeps_sample() {
        let cache = default_cache();
        cache.store(data(1, 1, 1)).expect("store");
        let first = cache.read(10, StateMask::ANY);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].info.sample_state, SampleState::NotRead);

        // Second read with NOT_READ mask finds nothing.
        assert!(cache.read(10, StateMask::NOT_READ).is_empty());
        // But the sample is still there, now READ and NOT_NEW.
        let again = cache.read(10, StateMask::ANY);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].info.sample_state, SampleState::Read);
        assert_eq!(again[0].info.view_state, ViewState::NotNew);
    }

    #[test]
    fn test_keep_last_eviction() {
        let config = ReaderCacheConfig::from_qos(&Qos::default().keep_last(2));
        let cache = ReaderCache::new(config);
        cache.store(data(1, 1, b'a')).expect("store");
        cache.store(data(1, 2, b'b')).expect("store");
        cache.store(data(1, 3, b'c')).expect("store");
        let taken = cache.take(10, StateMask::ANY);
        let bytes: Vec<u8> = taken
            .iter()
            .filter_map(|s| s.payload.as_deref().map(|p| p[0]))
            .collect();
        assert_eq!(bytes, vec![b'b', b'c']);
    }

    #[test]
    fn test_keep_all_rejects_at_limit() {
        let qos = Qos::default()
            .keep_all()
            .with_resource_limits(ResourceLimits::new(LENGTH_UNLIMITED, LENGTH_UNLIMITED, 2));
        let cache = ReaderCache::new(ReaderCacheConfig::from_qos(&qos));
        cache.store(data(1, 1, 1)).expect("store");
        cache.store(data(1, 2, 2)).expect("store");
        assert_eq!(cache.store(data(1, 3, 3)), Err(StoreReject::MaxSamplesPerInstance));
        assert_eq!(cache.samples_rejected.get(), 1);
        // Taking frees space for a retry.
        cache.take(1, StateMask::ANY);
        assert!(cache.store(data(1, 3, 3)).is_ok());
    }

    #[test]
    fn test_max_instances() {
        let qos = Qos::default()
            .keep_all()
            .with_resource_limits(ResourceLimits::new(LENGTH_UNLIMITED, 1, LENGTH_UNLIMITED));
        let cache = ReaderCache::new(ReaderCacheConfig::from_qos(&qos));
        cache.store(data(1, 1, 1)).expect("store");
        assert_eq!(cache.store(data(2, 2, 2)), Err(StoreReject::MaxInstances));
        assert_eq!(cache.instance_count(), 1);
    }

    #[test]
    fn test_rejected_store_rolls_back_instance() {
        let qos = Qos::default()
            .keep_all()
            .with_resource_limits(ResourceLimits::new(1, LENGTH_UNLIMITED, LENGTH_UNLIMITED));
        let cache = ReaderCache::new(ReaderCacheConfig::from_qos(&qos));
        cache.store(data(1, 1, 1)).expect("store");
        // Second instance admitted per max_instances but rejected on
        // max_samples: the empty record must not linger.
        assert_eq!(cache.store(data(2, 2, 2)), Err(StoreReject::MaxSamples));
        assert_eq!(cache.instance_count(), 1);
    }

    #[test]
    fn test_duplicate_seq_dropped() {
        let cache = default_cache();
        cache.store(data(1, 5, 1)).expect("store");
        cache.store(data(1, 5, 2)).expect("store"); // dup: dropped silently
        assert_eq!(cache.sample_count(), 1);
    }

    #[test]
    fn test_gap_counts_lost() {
        let cache = default_cache();
        cache.store(data(1, 1, 1)).expect("store");
        cache.store(data(1, 4, 2)).expect("store"); // 2 and 3 lost
        assert_eq!(cache.samples_lost.get(), 2);
    }

    #[test]
    fn test_dispose_transition_and_sentinel() {
        let cache = default_cache();
        cache.store(data(7, 1, 1)).expect("store");
        let taken = cache.take(10, StateMask::ANY);
        assert_eq!(taken.len(), 1);

        cache.store(dispose(7, 2)).expect("store");
        let mask = StateMask::new(
            SampleStateMask::ANY,
            ViewStateMask::ANY,
            InstanceStateMask::NOT_ALIVE_DISPOSED,
        );
        let sentinels = cache.take(10, mask);
        assert_eq!(sentinels.len(), 1);
        assert!(!sentinels[0].info.valid_data);
        assert_eq!(sentinels[0].info.instance_state, InstanceState::NotAliveDisposed);
        // Instance reclaimed after taking the last sample while not alive.
        assert_eq!(cache.instance_count(), 0);

        // A new write revives the key as a fresh NEW instance.
        cache.store(data(7, 3, 9)).expect("store");
        let revived = cache.take(10, StateMask::ANY);
        assert_eq!(revived.len(), 1);
        assert_eq!(revived[0].info.view_state, ViewState::New);
        assert_eq!(revived[0].info.instance_state, InstanceState::Alive);
    }

    #[test]
    fn test_unregister_last_writer_no_writers() {
        let cache = default_cache();
        cache.store(data(3, 1, 1)).expect("store");
        cache
            .store(IncomingSample {
                kind: IncomingKind::Unregister,
                payload: None,
                key: vec![3],
                writer_guid: wguid(1),
                seq: 2,
                source_timestamp: Time::now(),
                expiry: Time(i64::MAX),
            })
            .expect("store");
        let mask = StateMask::new(
            SampleStateMask::ANY,
            ViewStateMask::ANY,
            InstanceStateMask::NOT_ALIVE_NO_WRITERS,
        );
        let got = cache.read(10, mask);
        assert_eq!(got.len(), 2); // data sample + sentinel under a NO_WRITERS instance
        assert!(got.iter().any(|s| !s.info.valid_data));
    }

    #[test]
    fn test_writer_departed_moves_to_no_writers() {
        let cache = default_cache();
        cache.store(data(1, 1, 1)).expect("store");
        cache.writer_departed(wguid(1));
        let got = cache.read(10, StateMask::ANY);
        assert!(!got.is_empty());
        assert!(got
            .iter()
            .all(|s| s.info.instance_state == InstanceState::NotAliveNoWriters));
    }

    #[test]
    fn test_by_source_timestamp_drops_stale() {
        let qos = Qos::default()
            .keep_all()
            .with_destination_order(crate::qos::DestinationOrder::by_source_timestamp());
        let cache = ReaderCache::new(ReaderCacheConfig::from_qos(&qos));
        let mut newer = data(1, 1, 1);
        newer.source_timestamp = Time(1000);
        cache.store(newer).expect("store");
        let mut stale = data(1, 2, 2);
        stale.source_timestamp = Time(500);
        cache.store(stale).expect("store");
        assert_eq!(cache.sample_count(), 1);
    }

    #[test]
    fn test_autopurge_disposed() {
        let qos = Qos::default().keep_all().with_reader_data_lifecycle(
            ReaderDataLifecycle::with_delays(Duration::INFINITE, Duration::ZERO),
        );
        let cache = ReaderCache::new(ReaderCacheConfig::from_qos(&qos));
        cache.store(data(1, 1, 1)).expect("store");
        cache.store(dispose(1, 2)).expect("store");
        assert!(cache.next_purge_deadline().is_some());
        assert!(cache.purge_expired(MonotonicTime::now()));
        assert_eq!(cache.instance_count(), 0);
        assert_eq!(cache.sample_count(), 0);
    }

    #[test]
    fn test_purge_canceled_by_revival() {
        let qos = Qos::default().keep_all().with_reader_data_lifecycle(
            ReaderDataLifecycle::with_delays(Duration::INFINITE, Duration::from_secs(3600)),
        );
        let cache = ReaderCache::new(ReaderCacheConfig::from_qos(&qos));
        cache.store(data(1, 1, 1)).expect("store");
        cache.store(dispose(1, 2)).expect("store");
        assert!(cache.next_purge_deadline().is_some());
        // New data for the instance cancels the armed purge timer.
        cache.store(data(1, 3, 2)).expect("store");
        assert!(cache.next_purge_deadline().is_none());
    }

    #[test]
    fn test_take_ascending_seq_per_instance() {
        let cache = default_cache();
        for seq in 1..=5 {
            cache.store(data(1, seq, seq as u8)).expect("store");
        }
        let taken = cache.take(10, StateMask::ANY);
        let seqs: Vec<u64> = taken.iter().map(|s| s.info.sequence_number).collect();
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted);
    }

    #[test]
    fn test_max_zero_returns_empty() {
        let cache = default_cache();
        cache.store(data(1, 1, 1)).expect("store");
        assert!(cache.read(0, StateMask::ANY).is_empty());
    }

    #[test]
    fn test_condition_reevaluated_on_store_and_take() {
        let cache = default_cache();
        let cond = ReadConditionCore::new(
            SampleStateMask::NOT_READ,
            ViewStateMask::ANY,
            InstanceStateMask::ANY,
            None,
        );
        cache.attach_condition(&cond);
        assert!(!cond.trigger_value());

        cache.store(data(1, 1, 1)).expect("store");
        assert!(cond.trigger_value());

        cache.take(10, StateMask::ANY);
        assert!(!cond.trigger_value());
    }

    #[test]
    fn test_query_condition_predicate() {
        let cache = default_cache();
        let cond = ReadConditionCore::new(
            SampleStateMask::ANY,
            ViewStateMask::ANY,
            InstanceStateMask::ANY,
            Some(Box::new(|payload| payload[0] >= 10)),
        );
        cache.attach_condition(&cond);

        cache.store(data(1, 1, 5)).expect("store");
        assert!(!cond.trigger_value());
        cache.store(data(1, 2, 42)).expect("store");
        assert!(cond.trigger_value());

        // Take only the matching sample through the condition.
        let matched = cache.take_with_condition(10, &cond);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].payload.as_deref(), Some(&[42][..]));
        assert!(!cond.trigger_value());
        assert_eq!(cache.sample_count(), 1);
    }

    #[test]
    fn test_lookup_instance() {
        let cache = default_cache();
        cache.store(data(1, 1, 1)).expect("store");
        let iid = cache.lookup_instance(&[1]).expect("instance exists");
        assert!(cache.lookup_instance(&[2]).is_none());
        let got = cache.take_instance(iid, 10, StateMask::ANY);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].info.instance_handle, iid);
    }

    #[test]
    fn test_lifespan_expiry_removes_samples() {
        let cache = default_cache();
        let mut s = data(1, 1, 1);
        s.expiry = Time(Time::now().nanos() - 1);
        cache.store(s).expect("store");
        assert!(cache.take(10, StateMask::ANY).is_empty());
    }

    #[test]
    fn test_generation_counts_reported() {
        let cache = default_cache();
        cache.store(data(1, 1, 1)).expect("store");
        cache.store(dispose(1, 2)).expect("store");
        cache.store(data(1, 3, 2)).expect("store");
        let got = cache.read(10, StateMask::ANY);
        let newest = got.last().expect("samples present");
        assert_eq!(newest.info.disposed_generation_count, 1);
        assert_eq!(newest.info.absolute_generation_rank, 0);
        let oldest = &got[0];
        assert_eq!(oldest.info.disposed_generation_count, 0);
        assert_eq!(oldest.info.generation_rank, 1);
    }
}
