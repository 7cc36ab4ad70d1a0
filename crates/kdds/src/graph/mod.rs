// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! The entity graph: creation, enablement, deletion and the operations
//! every entity kind shares.
//!
//! Ownership is a tree (participant -> publisher/subscriber -> writer/
//! reader, participant -> topic); every record lives in the process-wide
//! handle table and back-references are handles validated on each use.
//! Deletion is recursive post-order: the handle is closed first so no new
//! pins succeed, kind-specific teardown runs, children are deleted, and
//! the slot is reclaimed once the last pin drains.
//!
//! Lock order, outer to inner: domain registries -> entity state ->
//! rhc/whc -> condition signal sets. The handle table lock is a leaf
//! taken only for slot resolution.

pub mod domain;
pub mod entity;
pub mod status;

use crate::builtin;
use crate::core::guid::{next_participant_prefix, Guid, GuidKind};
use crate::core::handles::{Handle, HandleTable, Pinned};
use crate::core::iid::iid_generator;
use crate::core::retcode::{ReturnCode, Result};
use crate::core::time::{Duration, MonotonicTime, Time};
use crate::core::types::{type_registry, TypeDescriptor};
use crate::dds::listener::{current_callback_entity, Dispatcher, Listener, StatusEvent};
use crate::qos::{PolicyId, Qos};
use crate::rhc::{
    CacheObserver, IncomingKind, IncomingSample, QueryPredicate, RawSample, ReadConditionCore,
    ReaderCache, ReaderCacheConfig, SampleStateMask, StateMask, StoreReject, ViewStateMask,
    InstanceStateMask,
};
use crate::stats::{StatKeyValue, StatKind, Statistics};
use crate::whc::{WhcSample, WriterCache, WriterCacheConfig};
use dashmap::DashMap;
use domain::{DomainState, EndpointEntry};
use entity::{
    EntityKind, EntityKindTag, EntityRecord, MatchedReader, MatchedWriter, ParticipantData,
    ReaderData, TopicData, WriterData,
};
use parking_lot::{Mutex, RwLock};
use status::StatusMask;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

const MAX_ENTITIES: usize = 1 << 15;

/// Process-wide context: the handle table and the per-domain registries.
pub struct Global {
    entities: HandleTable<EntityRecord>,
    domains: DashMap<u32, Arc<DomainState>>,
}

/// The process context, initialized once on first use.
pub fn global() -> &'static Global {
    static GLOBAL: OnceLock<Global> = OnceLock::new();
    GLOBAL.get_or_init(|| Global {
        entities: HandleTable::new(MAX_ENTITIES),
        domains: DashMap::new(),
    })
}

/// The process-wide entity handle table.
pub fn entities() -> &'static HandleTable<EntityRecord> {
    &global().entities
}

/// Domain state for an id, created on first use.
pub fn domain(domain_id: u32) -> Arc<DomainState> {
    Arc::clone(
        &global()
            .domains
            .entry(domain_id)
            .or_insert_with(|| Arc::new(DomainState::new(domain_id))),
    )
}

/// Pin an entity for the duration of an operation.
pub fn pin(handle: Handle) -> Result<Pinned<'static, EntityRecord>> {
    entities().pin(handle)
}

fn pin_kind(handle: Handle, tag: EntityKindTag) -> Result<Pinned<'static, EntityRecord>> {
    let pinned = pin(handle)?;
    if pinned.tag() != tag {
        return Err(ReturnCode::BadParameter);
    }
    Ok(pinned)
}

fn child_guid(participant: &EntityRecord, kind: GuidKind) -> Guid {
    let pd = participant
        .participant_data()
        .expect("guid allocation happens under a participant");
    let key = pd.entity_key_counter.fetch_add(1, Ordering::Relaxed);
    Guid::new(participant.guid.prefix, key, kind)
}

fn new_record(
    handle: Handle,
    guid: Guid,
    domain_id: u32,
    parent: Option<Handle>,
    qos: Qos,
    listener: Listener,
    kind: EntityKind,
) -> Arc<EntityRecord> {
    Arc::new(EntityRecord {
        handle,
        guid,
        iid: iid_generator().next(),
        domain_id,
        parent,
        status: status::EntityStatus::new(),
        listener: Mutex::new(listener),
        enabled: AtomicBool::new(false),
        qos: RwLock::new(qos),
        children: Mutex::new(Vec::new()),
        kind,
    })
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Create a domain participant.
pub fn create_participant(domain_id: u32, qos: Qos, listener: Listener) -> Result<Handle> {
    let qos = qos.merged_over(&Qos::default());
    qos.check_consistency()?;
    let dom = domain(domain_id);
    let prefix = next_participant_prefix();
    let handle = entities().insert(|h| {
        new_record(
            h,
            Guid::new(prefix, 0, GuidKind::Participant),
            domain_id,
            None,
            qos.clone(),
            listener.clone(),
            EntityKind::Participant(ParticipantData {
                domain: Arc::clone(&dom),
                dispatcher: Dispatcher::spawn(&format!("p{}", h.raw()), move || housekeep(h)),
                builtin: Mutex::new(None),
                builtin_seq: builtin::BuiltinSeq::default(),
                entity_key_counter: AtomicU32::new(1),
            }),
        )
    })?;
    dom.add_participant(handle);
    // Enable first so the builtin subscriber and readers auto-enable,
    // then announce the participant once its own readers exist.
    enable(handle)?;
    builtin::create_builtin_endpoints(handle)?;
    builtin::publish_participant(entities().peek(handle)?.as_ref());
    crate::log_info!("participant {} created in domain {}", handle.raw(), domain_id);
    Ok(handle)
}

/// Create (or re-open) a topic under a participant.
pub fn create_topic(
    participant: Handle,
    name: &str,
    desc: &Arc<TypeDescriptor>,
    qos: Qos,
    listener: Listener,
) -> Result<Handle> {
    let pp = pin_kind(participant, EntityKindTag::Participant)?;
    let qos = qos.merged_over(&Qos::default());
    qos.check_consistency()?;
    let desc = type_registry().register(desc)?;
    let dom = domain(pp.domain_id);
    dom.register_topic(name, &desc)?;
    let guid = child_guid(&pp, GuidKind::Topic);
    let record_qos = qos.clone();
    let handle = entities().insert(|h| {
        new_record(
            h,
            guid,
            pp.domain_id,
            Some(participant),
            record_qos.clone(),
            listener.clone(),
            EntityKind::Topic(TopicData {
                name: name.to_string(),
                type_desc: Arc::clone(&desc),
            }),
        )
    })?;
    pp.add_child(handle);
    if pp.is_enabled() && pp.qos.read().entity_factory.autoenable_created_entities {
        enable(handle)?;
    }
    Ok(handle)
}

fn create_group(
    participant: Handle,
    qos: Qos,
    listener: Listener,
    kind: EntityKindTag,
) -> Result<Handle> {
    let pp = pin_kind(participant, EntityKindTag::Participant)?;
    let qos = qos.merged_over(&Qos::default());
    qos.check_consistency()?;
    let (guid_kind, entity_kind) = match kind {
        EntityKindTag::Publisher => (GuidKind::Publisher, EntityKind::Publisher),
        EntityKindTag::Subscriber => (GuidKind::Subscriber, EntityKind::Subscriber),
        _ => return Err(ReturnCode::BadParameter),
    };
    let guid = child_guid(&pp, guid_kind);
    let handle = entities().insert(|h| {
        new_record(
            h,
            guid,
            pp.domain_id,
            Some(participant),
            qos.clone(),
            listener.clone(),
            entity_kind,
        )
    })?;
    pp.add_child(handle);
    if pp.is_enabled() && pp.qos.read().entity_factory.autoenable_created_entities {
        enable(handle)?;
    }
    Ok(handle)
}

/// Create a publisher under a participant.
pub fn create_publisher(participant: Handle, qos: Qos, listener: Listener) -> Result<Handle> {
    create_group(participant, qos, listener, EntityKindTag::Publisher)
}

/// Create a subscriber under a participant.
pub fn create_subscriber(participant: Handle, qos: Qos, listener: Listener) -> Result<Handle> {
    create_group(participant, qos, listener, EntityKindTag::Subscriber)
}

/// Create a data writer under a publisher, bound to a topic.
pub fn create_writer(
    publisher: Handle,
    topic: Handle,
    qos: Qos,
    listener: Listener,
) -> Result<Handle> {
    let pb = pin_kind(publisher, EntityKindTag::Publisher)?;
    let tp = pin_kind(topic, EntityKindTag::Topic)?;
    if tp.parent != pb.parent {
        return Err(ReturnCode::PreconditionNotMet);
    }
    let td = tp.topic_data().expect("topic record has topic data");
    let qos = qos.merged_over(&Qos::default());
    qos.check_consistency()?;
    let participant = pb.parent.ok_or(ReturnCode::PreconditionNotMet)?;
    let pp = pin(participant)?;
    let guid = child_guid(&pp, GuidKind::Writer);
    let whc_config = WriterCacheConfig::from_qos(&qos);
    let topic_name = td.name.clone();
    let type_desc = Arc::clone(&td.type_desc);
    let handle = entities().insert(|h| {
        new_record(
            h,
            guid,
            pb.domain_id,
            Some(publisher),
            qos.clone(),
            listener.clone(),
            EntityKind::Writer(WriterData {
                topic_name: topic_name.clone(),
                type_desc: Arc::clone(&type_desc),
                whc: WriterCache::new(whc_config.clone()),
                matched: Mutex::new(Vec::new()),
                publication_matched: Mutex::new(Default::default()),
                offered_incompatible: Mutex::new(Default::default()),
            }),
        )
    })?;
    pb.add_child(handle);
    if pb.is_enabled() && pb.qos.read().entity_factory.autoenable_created_entities {
        enable(handle)?;
    }
    Ok(handle)
}

/// Create a data reader under a subscriber, bound to a topic.
pub fn create_reader(
    subscriber: Handle,
    topic: Handle,
    qos: Qos,
    listener: Listener,
) -> Result<Handle> {
    let tp = pin_kind(topic, EntityKindTag::Topic)?;
    let td = tp.topic_data().expect("topic record has topic data");
    create_reader_raw(
        subscriber,
        &td.name.clone(),
        &Arc::clone(&td.type_desc),
        qos,
        listener,
        false,
    )
}

/// Reader creation shared by the public path and the builtin readers.
pub(crate) fn create_reader_raw(
    subscriber: Handle,
    topic_name: &str,
    type_desc: &Arc<TypeDescriptor>,
    qos: Qos,
    listener: Listener,
    is_builtin: bool,
) -> Result<Handle> {
    let sb = pin_kind(subscriber, EntityKindTag::Subscriber)?;
    let qos = qos.merged_over(&Qos::default());
    qos.check_consistency()?;
    let participant = sb.parent.ok_or(ReturnCode::PreconditionNotMet)?;
    let pp = pin(participant)?;
    let guid = child_guid(
        &pp,
        if is_builtin {
            GuidKind::BuiltinReader
        } else {
            GuidKind::Reader
        },
    );
    let rhc_config = ReaderCacheConfig::from_qos(&qos);
    let name = topic_name.to_string();
    let desc = Arc::clone(type_desc);
    let handle = entities().insert(|h| {
        new_record(
            h,
            guid,
            sb.domain_id,
            Some(subscriber),
            qos.clone(),
            listener.clone(),
            EntityKind::Reader(ReaderData {
                topic_name: name.clone(),
                type_desc: Arc::clone(&desc),
                rhc: ReaderCache::new(rhc_config.clone()),
                matched: Mutex::new(Vec::new()),
                subscription_matched: Mutex::new(Default::default()),
                requested_incompatible: Mutex::new(Default::default()),
                sample_lost: Mutex::new(Default::default()),
                sample_rejected: Mutex::new(Default::default()),
                conditions: Mutex::new(Vec::new()),
                builtin: is_builtin,
            }),
        )
    })?;
    sb.add_child(handle);
    {
        let record = entities().peek(handle)?;
        let rd = record.reader_data().expect("reader record has reader data");
        rd.rhc.set_observer(Arc::new(ReaderObserver {
            reader: handle,
            subscriber,
        }));
    }
    if sb.is_enabled() && sb.qos.read().entity_factory.autoenable_created_entities {
        enable(handle)?;
    }
    Ok(handle)
}

// ---------------------------------------------------------------------------
// Enable / delete
// ---------------------------------------------------------------------------

/// Enable an entity. Enabling an enabled entity is a no-op; enabling a
/// child of a still-disabled factory is refused.
pub fn enable(handle: Handle) -> Result<()> {
    let e = pin(handle)?;
    if e.is_enabled() {
        return Ok(());
    }
    if let Some(parent) = e.parent {
        if !entities().peek(parent)?.is_enabled() {
            return Err(ReturnCode::PreconditionNotMet);
        }
    }
    e.enabled.store(true, Ordering::Release);
    let record = e.entity();
    match record.tag() {
        // The participant announcement is published by create_participant
        // after its builtin readers exist.
        EntityKindTag::Participant => {}
        EntityKindTag::Topic => builtin::publish_topic(&record),
        EntityKindTag::Writer => {
            domain(record.domain_id).register_endpoint(endpoint_entry(&record)?);
            builtin::publish_publication(&record);
        }
        EntityKindTag::Reader => {
            let rd = record.reader_data().expect("reader record has reader data");
            if !rd.builtin {
                domain(record.domain_id).register_endpoint(endpoint_entry(&record)?);
                builtin::publish_subscription(&record);
            }
        }
        EntityKindTag::Publisher | EntityKindTag::Subscriber => {}
    }
    Ok(())
}

/// Recursive post-order delete. Safe to call on an already-deleted
/// handle (returns `AlreadyDeleted` without side effects).
pub fn delete(handle: Handle) -> Result<()> {
    let pinned = pin(handle)?;
    let record = pinned.entity();
    if let Err(err) = entities().close(handle) {
        // Another deleter raced us.
        drop(pinned);
        return Err(err);
    }

    teardown(&record);

    let children = record.children.lock().clone();
    for child in children.into_iter().rev() {
        let _ = delete(child);
    }

    if let Some(pd) = record.participant_data() {
        pd.dispatcher.shutdown();
    }

    drop(pinned);
    entities().delete(handle)?;
    if let Some(parent) = record.parent {
        if let Ok(parent_record) = entities().peek(parent) {
            parent_record.remove_child(handle);
        }
    }
    Ok(())
}

fn teardown(record: &Arc<EntityRecord>) {
    match record.tag() {
        EntityKindTag::Writer => writer_teardown(record),
        EntityKindTag::Reader => reader_teardown(record),
        EntityKindTag::Topic => {
            if record.is_enabled() {
                builtin::dispose_topic(record);
            }
            let td = record.topic_data().expect("topic record has topic data");
            domain(record.domain_id).release_topic(&td.name);
        }
        EntityKindTag::Participant => {
            if record.is_enabled() {
                builtin::dispose_participant(record);
            }
            domain(record.domain_id).remove_participant(record.handle);
        }
        EntityKindTag::Publisher | EntityKindTag::Subscriber => {}
    }
}

fn writer_teardown(record: &Arc<EntityRecord>) {
    let wd = record.writer_data().expect("writer record has writer data");
    if record.is_enabled() {
        // Writer-data-lifecycle: unregister (optionally dispose) every
        // registered instance before the writer disappears.
        let autodispose = record
            .qos
            .read()
            .writer_data_lifecycle
            .autodispose_unregistered_instances;
        let kind = if autodispose {
            IncomingKind::DisposeUnregister
        } else {
            IncomingKind::Unregister
        };
        for key in wd.whc.registered_keys() {
            let _ = write_message(record, kind, None, key, Time::now());
        }

        let matched = wd.matched.lock().clone();
        for m in matched {
            wd.whc.remove_reader(m.handle);
            if let Ok(r) = pin(m.handle) {
                if let Some(rd) = r.reader_data() {
                    rd.matched.lock().retain(|x| x.handle != record.handle);
                    rd.rhc.writer_departed(record.guid);
                    let snapshot = {
                        let mut s = rd.subscription_matched.lock();
                        s.current_count = s.current_count.saturating_sub(1);
                        s.current_count_change -= 1;
                        *s
                    };
                    raise_event(&r.entity(), StatusEvent::SubscriptionMatched(snapshot));
                }
            }
        }
        wd.matched.lock().clear();
        domain(record.domain_id).unregister_endpoint(record.handle);
        builtin::dispose_publication(record);
    }
    wd.whc.close();
}

fn reader_teardown(record: &Arc<EntityRecord>) {
    let rd = record.reader_data().expect("reader record has reader data");
    if rd.builtin || !record.is_enabled() {
        return;
    }
    let matched = rd.matched.lock().clone();
    for m in matched {
        if let Ok(w) = pin(m.handle) {
            if let Some(wd) = w.writer_data() {
                wd.matched.lock().retain(|x| x.handle != record.handle);
                wd.whc.remove_reader(record.handle);
                let snapshot = {
                    let mut s = wd.publication_matched.lock();
                    s.current_count = s.current_count.saturating_sub(1);
                    s.current_count_change -= 1;
                    *s
                };
                raise_event(&w.entity(), StatusEvent::PublicationMatched(snapshot));
            }
        }
    }
    rd.matched.lock().clear();
    domain(record.domain_id).unregister_endpoint(record.handle);
    builtin::dispose_subscription(record);
}

// ---------------------------------------------------------------------------
// QoS and generic entity operations
// ---------------------------------------------------------------------------

/// Get the entity's QoS (fully populated).
pub fn get_qos(handle: Handle) -> Result<Qos> {
    Ok(pin(handle)?.qos.read().clone())
}

/// Apply a (possibly partial) QoS update.
pub fn set_qos(handle: Handle, qos: &Qos) -> Result<()> {
    let e = pin(handle)?;
    let current = e.qos.read().clone();
    let merged = qos.merged_over(&current);
    merged.check_consistency()?;
    if e.is_enabled() {
        merged.check_mutability(&current)?;
    }
    *e.qos.write() = merged.clone();

    if !e.is_enabled() {
        return Ok(());
    }
    let record = e.entity();
    match record.tag() {
        EntityKindTag::Writer | EntityKindTag::Reader => {
            let dom = domain(record.domain_id);
            dom.requalify_endpoint(record.handle, effective_qos(&record)?);
        }
        EntityKindTag::Publisher | EntityKindTag::Subscriber => {
            // Partition lives on the group; requalify every child endpoint.
            let dom = domain(record.domain_id);
            for child in record.children.lock().clone() {
                if let Ok(child_record) = entities().peek(child) {
                    if matches!(
                        child_record.tag(),
                        EntityKindTag::Writer | EntityKindTag::Reader
                    ) {
                        if let Ok(eff) = effective_qos(&child_record) {
                            dom.requalify_endpoint(child, eff);
                        }
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Effective matching QoS of an endpoint: its own policies with the
/// owning group's partition.
fn effective_qos(record: &Arc<EntityRecord>) -> Result<Qos> {
    let group = record.parent.ok_or(ReturnCode::PreconditionNotMet)?;
    let group_record = entities().peek(group)?;
    let partition = group_record.qos.read().partition.clone();
    Ok(record.qos.read().clone().with_partition(partition))
}

fn endpoint_entry(record: &Arc<EntityRecord>) -> Result<EndpointEntry> {
    let (topic_name, type_id) = match &record.kind {
        EntityKind::Writer(wd) => (wd.topic_name.clone(), wd.type_desc.type_id),
        EntityKind::Reader(rd) => (rd.topic_name.clone(), rd.type_desc.type_id),
        _ => return Err(ReturnCode::BadParameter),
    };
    Ok(EndpointEntry {
        handle: record.handle,
        guid: record.guid,
        kind: record.tag(),
        topic_name,
        type_id,
        qos: effective_qos(record)?,
        participant: get_participant(record.handle)?,
    })
}

/// Parent handle (`None` for participants).
pub fn get_parent(handle: Handle) -> Result<Option<Handle>> {
    Ok(pin(handle)?.parent)
}

/// Owning participant (itself for a participant).
pub fn get_participant(handle: Handle) -> Result<Handle> {
    let mut current = handle;
    loop {
        let record = entities().peek(current)?;
        if record.tag() == EntityKindTag::Participant {
            return Ok(current);
        }
        current = record.parent.ok_or(ReturnCode::Error)?;
    }
}

/// Child handles in creation order.
pub fn get_children(handle: Handle) -> Result<Vec<Handle>> {
    Ok(pin(handle)?.children.lock().clone())
}

/// The entity's domain id.
pub fn get_domain_id(handle: Handle) -> Result<u32> {
    Ok(pin(handle)?.domain_id)
}

/// The entity's GUID.
pub fn get_guid(handle: Handle) -> Result<Guid> {
    Ok(pin(handle)?.guid)
}

/// The entity's instance handle (opaque 64-bit id).
pub fn get_instance_handle(handle: Handle) -> Result<u64> {
    Ok(pin(handle)?.iid)
}

/// Replace the listener table.
pub fn set_listener(handle: Handle, listener: Listener) -> Result<()> {
    *pin(handle)?.listener.lock() = listener;
    Ok(())
}

/// Raised status bits, without clearing.
pub fn read_status(handle: Handle) -> Result<StatusMask> {
    Ok(pin(handle)?.status.read())
}

/// Raised status bits, clearing them.
pub fn take_status(handle: Handle) -> Result<StatusMask> {
    Ok(pin(handle)?.status.take())
}

/// Entity-level enabled status mask.
pub fn get_status_mask(handle: Handle) -> Result<StatusMask> {
    Ok(pin(handle)?.status.enabled_mask())
}

/// Replace the entity-level enabled status mask.
pub fn set_status_mask(handle: Handle, mask: StatusMask) -> Result<()> {
    pin(handle)?.status.set_enabled_mask(mask);
    Ok(())
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

pub(crate) fn is_matched(writer: Handle, reader: Handle) -> bool {
    entities()
        .peek(writer)
        .ok()
        .and_then(|w| {
            w.writer_data()
                .map(|wd| wd.matched.lock().iter().any(|m| m.handle == reader))
        })
        .unwrap_or(false)
}

pub(crate) fn apply_match(writer: &EndpointEntry, reader: &EndpointEntry) {
    let (Ok(w), Ok(r)) = (pin(writer.handle), pin(reader.handle)) else {
        return;
    };
    let (Some(wd), Some(rd)) = (w.writer_data(), r.reader_data()) else {
        return;
    };

    let reliable = reader.qos.reliability.is_reliable();
    let deliver_history =
        writer.qos.durability.keeps_history() && reader.qos.durability.keeps_history();

    {
        let mut matched = wd.matched.lock();
        if matched.iter().any(|m| m.handle == reader.handle) {
            return;
        }
        matched.push(MatchedReader {
            handle: reader.handle,
            guid: reader.guid,
            reliable,
        });
    }
    let history = wd.whc.add_reader(reader.handle, reliable, deliver_history);
    rd.matched.lock().push(MatchedWriter {
        handle: writer.handle,
        guid: writer.guid,
    });

    let pub_snapshot = {
        let mut s = wd.publication_matched.lock();
        s.total_count += 1;
        s.total_count_change += 1;
        s.current_count += 1;
        s.current_count_change += 1;
        *s
    };
    raise_event(&w.entity(), StatusEvent::PublicationMatched(pub_snapshot));

    let sub_snapshot = {
        let mut s = rd.subscription_matched.lock();
        s.total_count += 1;
        s.total_count_change += 1;
        s.current_count += 1;
        s.current_count_change += 1;
        *s
    };
    raise_event(&r.entity(), StatusEvent::SubscriptionMatched(sub_snapshot));
    crate::log_discovery!(
        "matched writer {} and reader {} on {:?}",
        writer.handle.raw(),
        reader.handle.raw(),
        writer.topic_name
    );
    log::debug!(
        "[GRAPH] match writer={:?} reader={:?} reliable={} history={}",
        writer.guid,
        reader.guid,
        reliable,
        deliver_history
    );

    // Transient-local replay for the late joiner.
    for sample in history {
        if !deliver_one(wd, w.guid, &r.entity(), &sample) {
            break;
        }
    }
}

pub(crate) fn apply_unmatch(writer: Handle, reader: Handle, writer_guid: Guid) {
    if let Ok(w) = pin(writer) {
        if let Some(wd) = w.writer_data() {
            let removed = {
                let mut matched = wd.matched.lock();
                let before = matched.len();
                matched.retain(|m| m.handle != reader);
                matched.len() != before
            };
            if removed {
                wd.whc.remove_reader(reader);
                let snapshot = {
                    let mut s = wd.publication_matched.lock();
                    s.current_count = s.current_count.saturating_sub(1);
                    s.current_count_change -= 1;
                    *s
                };
                raise_event(&w.entity(), StatusEvent::PublicationMatched(snapshot));
            }
        }
    }
    if let Ok(r) = pin(reader) {
        if let Some(rd) = r.reader_data() {
            let removed = {
                let mut matched = rd.matched.lock();
                let before = matched.len();
                matched.retain(|m| m.handle != writer);
                matched.len() != before
            };
            if removed {
                rd.rhc.writer_departed(writer_guid);
                let snapshot = {
                    let mut s = rd.subscription_matched.lock();
                    s.current_count = s.current_count.saturating_sub(1);
                    s.current_count_change -= 1;
                    *s
                };
                raise_event(&r.entity(), StatusEvent::SubscriptionMatched(snapshot));
            }
        }
    }
}

pub(crate) fn apply_incompatible_qos(writer: Handle, reader: Handle, policy: PolicyId) {
    crate::log_discovery!(
        "writer {} and reader {} incompatible on {:?}",
        writer.raw(),
        reader.raw(),
        policy
    );
    if let Ok(w) = pin(writer) {
        if let Some(wd) = w.writer_data() {
            let snapshot = {
                let mut s = wd.offered_incompatible.lock();
                s.total_count += 1;
                s.total_count_change += 1;
                s.last_policy_id = Some(policy);
                *s
            };
            raise_event(&w.entity(), StatusEvent::OfferedIncompatibleQos(snapshot));
        }
    }
    if let Ok(r) = pin(reader) {
        if let Some(rd) = r.reader_data() {
            let snapshot = {
                let mut s = rd.requested_incompatible.lock();
                s.total_count += 1;
                s.total_count_change += 1;
                s.last_policy_id = Some(policy);
                *s
            };
            raise_event(&r.entity(), StatusEvent::RequestedIncompatibleQos(snapshot));
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// Publish one message (data sample or dispose/unregister sentinel)
/// through a writer: append to the whc, then push to every matched
/// reader in sequence order.
pub fn write_message(
    writer: &EntityRecord,
    kind: IncomingKind,
    payload: Option<Arc<[u8]>>,
    key: Vec<u8>,
    timestamp: Time,
) -> Result<u64> {
    if !writer.is_enabled() {
        return Err(ReturnCode::NotEnabled);
    }
    if current_callback_entity() == Some(writer.handle) {
        return Err(ReturnCode::IllegalOperation);
    }
    let wd = writer.writer_data().ok_or(ReturnCode::BadParameter)?;
    let deadline = MonotonicTime::deadline_after(writer.qos.read().reliability.max_blocking_time);
    let sample = wd.whc.insert(kind, payload, key, timestamp, deadline)?;
    let seq = sample.seq;

    let matched = wd.matched.lock().clone();
    for m in matched {
        if let Ok(r) = pin(m.handle) {
            // Deliver strictly in order: everything still pending for this
            // reader, which includes the sample just inserted.
            for pending in wd.whc.pending_for(m.handle) {
                if !deliver_one(wd, writer.guid, &r.entity(), &pending) {
                    break;
                }
            }
        }
    }
    Ok(seq)
}

/// Push one whc sample into a reader cache. Returns false when the
/// sample stays pending (reliable reader out of resources).
fn deliver_one(
    wd: &WriterData,
    writer_guid: Guid,
    reader: &Arc<EntityRecord>,
    sample: &WhcSample,
) -> bool {
    let Some(rd) = reader.reader_data() else {
        return true;
    };
    let incoming = IncomingSample {
        kind: sample.kind,
        payload: sample.payload.clone(),
        key: sample.key.clone(),
        writer_guid,
        seq: sample.seq,
        source_timestamp: sample.source_timestamp,
        expiry: sample.expiry,
    };
    match rd.rhc.store(incoming) {
        Ok(()) => {
            wd.whc.ack(reader.handle, sample.seq);
            true
        }
        Err(_reject) => {
            let reliable = reader.qos.read().reliability.is_reliable();
            if !reliable {
                // Best effort: the drop is final, move on.
                wd.whc.ack(reader.handle, sample.seq);
                return true;
            }
            false
        }
    }
}

/// Retry pending samples toward a reader whose cache freed up.
pub(crate) fn pump_pending(reader: &EntityRecord) {
    let Some(rd) = reader.reader_data() else {
        return;
    };
    let matched = rd.matched.lock().clone();
    for m in matched {
        if let Ok(w) = pin(m.handle) {
            if let Some(wd) = w.writer_data() {
                let reader_record = match entities().peek(reader.handle) {
                    Ok(record) => record,
                    Err(_) => return,
                };
                for pending in wd.whc.pending_for(reader.handle) {
                    if !deliver_one(wd, w.guid, &reader_record, &pending) {
                        break;
                    }
                }
            }
        }
    }
}

/// Block until all matched reliable readers acknowledged everything
/// this writer published.
pub fn wait_for_acknowledgments(writer: &EntityRecord, timeout: Duration) -> Result<()> {
    if !writer.is_enabled() {
        return Err(ReturnCode::NotEnabled);
    }
    if current_callback_entity() == Some(writer.handle) {
        return Err(ReturnCode::IllegalOperation);
    }
    let wd = writer.writer_data().ok_or(ReturnCode::BadParameter)?;
    wd.whc.wait_for_acks(MonotonicTime::deadline_after(timeout))
}

// ---------------------------------------------------------------------------
// Reader access
// ---------------------------------------------------------------------------

/// Shared read/take implementation used by the typed and raw facades.
pub fn reader_access(
    reader: &EntityRecord,
    max: usize,
    mask: StateMask,
    cond: Option<&ReadConditionCore>,
    instance: Option<u64>,
    take: bool,
) -> Result<Vec<RawSample>> {
    if !reader.is_enabled() {
        return Err(ReturnCode::NotEnabled);
    }
    let rd = reader.reader_data().ok_or(ReturnCode::BadParameter)?;
    let out = match (cond, instance) {
        (Some(c), _) => {
            if take {
                rd.rhc.take_with_condition(max, c)
            } else {
                rd.rhc.read_with_condition(max, c)
            }
        }
        (None, Some(iid)) => {
            if take {
                rd.rhc.take_instance(iid, max, mask)
            } else {
                rd.rhc.read_instance(iid, max, mask)
            }
        }
        (None, None) => {
            if take {
                rd.rhc.take(max, mask)
            } else {
                rd.rhc.read(max, mask)
            }
        }
    };
    // Access clears the data-available statuses regardless of outcome.
    reader.status.clear(StatusMask::DATA_AVAILABLE);
    if let Some(parent) = reader.parent {
        if let Ok(sub) = entities().peek(parent) {
            sub.status.clear(StatusMask::DATA_ON_READERS);
        }
    }
    if out.is_empty() {
        return Err(ReturnCode::NoData);
    }
    if take {
        pump_pending(reader);
    }
    Ok(out)
}

/// Create a read (or, with a predicate, query) condition on a reader.
pub fn create_read_condition(
    reader: &EntityRecord,
    sample_mask: SampleStateMask,
    view_mask: ViewStateMask,
    instance_mask: InstanceStateMask,
    predicate: Option<QueryPredicate>,
) -> Result<Arc<ReadConditionCore>> {
    let rd = reader.reader_data().ok_or(ReturnCode::BadParameter)?;
    let cond = ReadConditionCore::new(sample_mask, view_mask, instance_mask, predicate);
    rd.conditions.lock().push(Arc::clone(&cond));
    rd.rhc.attach_condition(&cond);
    Ok(cond)
}

/// Remove a read/query condition from its reader.
pub fn remove_read_condition(reader: &EntityRecord, id: u64) -> Result<()> {
    let rd = reader.reader_data().ok_or(ReturnCode::BadParameter)?;
    let mut conds = rd.conditions.lock();
    let before = conds.len();
    conds.retain(|c| c.id() != id);
    if conds.len() == before {
        return Err(ReturnCode::PreconditionNotMet);
    }
    rd.rhc.detach_condition(id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Status events and listener dispatch
// ---------------------------------------------------------------------------

/// Raise a status: a listener set for it (on the entity, or for the
/// data-available family on an ancestor) consumes the event; otherwise
/// the status bit is raised and the status condition re-evaluated.
pub(crate) fn raise_event(record: &Arc<EntityRecord>, event: StatusEvent) {
    let status = event.status();
    if let Some(callback) = find_listener(record, status) {
        if let Some(participant) = participant_record(record) {
            if let Some(pd) = participant.participant_data() {
                pd.dispatcher.enqueue(callback, record.handle, event);
                return;
            }
        }
    }
    record.status.raise(status);
}

fn find_listener(
    record: &Arc<EntityRecord>,
    status: StatusMask,
) -> Option<crate::dds::listener::Callback> {
    if let Some(callback) = record.listener.lock().get(status) {
        return Some(callback);
    }
    // Only the data-available family inherits from ancestors.
    if status != StatusMask::DATA_AVAILABLE && status != StatusMask::DATA_ON_READERS {
        return None;
    }
    let mut parent = record.parent;
    while let Some(handle) = parent {
        let ancestor = entities().peek(handle).ok()?;
        if let Some(callback) = ancestor.listener.lock().get(status) {
            return Some(callback);
        }
        parent = ancestor.parent;
    }
    None
}

fn participant_record(record: &Arc<EntityRecord>) -> Option<Arc<EntityRecord>> {
    if record.tag() == EntityKindTag::Participant {
        return entities().peek(record.handle).ok();
    }
    let participant = get_participant(record.handle).ok()?;
    entities().peek(participant).ok()
}

/// Reader-cache observer wired to the entity layer.
struct ReaderObserver {
    reader: Handle,
    subscriber: Handle,
}

impl CacheObserver for ReaderObserver {
    fn on_data_available(&self) {
        if let Ok(r) = entities().peek(self.reader) {
            raise_event(&r, StatusEvent::DataAvailable);
        }
        if let Ok(s) = entities().peek(self.subscriber) {
            raise_event(&s, StatusEvent::DataOnReaders);
        }
    }

    fn on_sample_lost(&self, count: u32) {
        if let Ok(r) = entities().peek(self.reader) {
            if let Some(rd) = r.reader_data() {
                let snapshot = {
                    let mut s = rd.sample_lost.lock();
                    s.total_count += count;
                    s.total_count_change += count;
                    *s
                };
                raise_event(&r, StatusEvent::SampleLost(snapshot));
            }
        }
    }

    fn on_sample_rejected(&self, reason: StoreReject, instance_handle: u64) {
        if let Ok(r) = entities().peek(self.reader) {
            if let Some(rd) = r.reader_data() {
                let snapshot = {
                    let mut s = rd.sample_rejected.lock();
                    s.total_count += 1;
                    s.total_count_change += 1;
                    s.last_reason = Some(reason);
                    s.last_instance_handle = instance_handle;
                    *s
                };
                raise_event(&r, StatusEvent::SampleRejected(snapshot));
            }
        }
    }
}

/// Housekeeping tick, run on the participant's dispatch thread: drive
/// auto-purge deadlines and retry pending reliable deliveries.
fn housekeep(participant: Handle) {
    let Ok(p) = entities().pin(participant) else {
        return;
    };
    let Some(pd) = p.participant_data() else {
        return;
    };
    let now = MonotonicTime::now();
    for handle in pd.domain.reader_endpoints_of(participant) {
        if let Ok(r) = pin(handle) {
            if let Some(rd) = r.reader_data() {
                rd.rhc.purge_expired(now);
                pump_pending(&r);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Capture a statistics snapshot for an entity.
pub fn create_statistics(handle: Handle) -> Result<Statistics> {
    let e = pin(handle)?;
    let mut stat = Statistics {
        entity: handle,
        opaque: e.iid,
        time: Time::now(),
        kv: statistics_descriptor(&e),
    };
    refresh_values(&e, &mut stat.kv);
    Ok(stat)
}

/// Refresh a snapshot in place. Rejected when the entity behind the
/// handle was deleted and the handle reincarnated.
pub fn refresh_statistics(stat: &mut Statistics) -> Result<()> {
    let e = pin(stat.entity)?;
    if e.iid != stat.opaque {
        return Err(ReturnCode::BadParameter);
    }
    stat.time = Time::now();
    refresh_values(&e, &mut stat.kv);
    Ok(())
}

fn statistics_descriptor(record: &EntityRecord) -> Vec<StatKeyValue> {
    match record.tag() {
        EntityKindTag::Writer => vec![
            StatKeyValue {
                name: "samples_written",
                kind: StatKind::U64,
                value: 0,
            },
            StatKeyValue {
                name: "whc_current_size",
                kind: StatKind::U32,
                value: 0,
            },
            StatKeyValue {
                name: "whc_occupancy",
                kind: StatKind::LengthTime,
                value: 0,
            },
        ],
        EntityKindTag::Reader => vec![
            StatKeyValue {
                name: "samples_received",
                kind: StatKind::U64,
                value: 0,
            },
            StatKeyValue {
                name: "samples_lost",
                kind: StatKind::U64,
                value: 0,
            },
            StatKeyValue {
                name: "samples_rejected",
                kind: StatKind::U64,
                value: 0,
            },
            StatKeyValue {
                name: "rhc_current_size",
                kind: StatKind::U32,
                value: 0,
            },
            StatKeyValue {
                name: "rhc_occupancy",
                kind: StatKind::LengthTime,
                value: 0,
            },
        ],
        _ => Vec::new(),
    }
}

fn refresh_values(record: &EntityRecord, kv: &mut [StatKeyValue]) {
    match &record.kind {
        EntityKind::Writer(wd) => {
            for entry in kv.iter_mut() {
                entry.value = match entry.name {
                    "samples_written" => wd.whc.samples_written.get(),
                    "whc_current_size" => wd.whc.len() as u64,
                    "whc_occupancy" => wd.whc.occupancy.integral(),
                    _ => entry.value,
                };
            }
        }
        EntityKind::Reader(rd) => {
            for entry in kv.iter_mut() {
                entry.value = match entry.name {
                    "samples_received" => rd.rhc.samples_received.get(),
                    "samples_lost" => rd.rhc.samples_lost.get(),
                    "samples_rejected" => rd.rhc.samples_rejected.get(),
                    "rhc_current_size" => rd.rhc.sample_count() as u64,
                    "rhc_occupancy" => rd.rhc.occupancy.integral(),
                    _ => entry.value,
                };
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Typed status accessors (consume change counts, clear the bit)
// ---------------------------------------------------------------------------

/// Subscription-matched status; consuming resets the change counts.
pub fn subscription_matched_status(
    reader: &EntityRecord,
) -> Result<status::SubscriptionMatchedStatus> {
    let rd = reader.reader_data().ok_or(ReturnCode::BadParameter)?;
    let out = {
        let mut s = rd.subscription_matched.lock();
        let out = *s;
        s.total_count_change = 0;
        s.current_count_change = 0;
        out
    };
    reader.status.clear(StatusMask::SUBSCRIPTION_MATCHED);
    Ok(out)
}

/// Publication-matched status; consuming resets the change counts.
pub fn publication_matched_status(
    writer: &EntityRecord,
) -> Result<status::PublicationMatchedStatus> {
    let wd = writer.writer_data().ok_or(ReturnCode::BadParameter)?;
    let out = {
        let mut s = wd.publication_matched.lock();
        let out = *s;
        s.total_count_change = 0;
        s.current_count_change = 0;
        out
    };
    writer.status.clear(StatusMask::PUBLICATION_MATCHED);
    Ok(out)
}

/// Requested-incompatible-QoS status; consuming resets the change count.
pub fn requested_incompatible_qos_status(
    reader: &EntityRecord,
) -> Result<status::IncompatibleQosStatus> {
    let rd = reader.reader_data().ok_or(ReturnCode::BadParameter)?;
    let out = {
        let mut s = rd.requested_incompatible.lock();
        let out = *s;
        s.total_count_change = 0;
        out
    };
    reader.status.clear(StatusMask::REQUESTED_INCOMPATIBLE_QOS);
    Ok(out)
}

/// Offered-incompatible-QoS status; consuming resets the change count.
pub fn offered_incompatible_qos_status(
    writer: &EntityRecord,
) -> Result<status::IncompatibleQosStatus> {
    let wd = writer.writer_data().ok_or(ReturnCode::BadParameter)?;
    let out = {
        let mut s = wd.offered_incompatible.lock();
        let out = *s;
        s.total_count_change = 0;
        out
    };
    writer.status.clear(StatusMask::OFFERED_INCOMPATIBLE_QOS);
    Ok(out)
}

/// Sample-lost status; consuming resets the change count.
pub fn sample_lost_status(reader: &EntityRecord) -> Result<status::SampleLostStatus> {
    let rd = reader.reader_data().ok_or(ReturnCode::BadParameter)?;
    let out = {
        let mut s = rd.sample_lost.lock();
        let out = *s;
        s.total_count_change = 0;
        out
    };
    reader.status.clear(StatusMask::SAMPLE_LOST);
    Ok(out)
}

/// Sample-rejected status; consuming resets the change count.
pub fn sample_rejected_status(reader: &EntityRecord) -> Result<status::SampleRejectedStatus> {
    let rd = reader.reader_data().ok_or(ReturnCode::BadParameter)?;
    let out = {
        let mut s = rd.sample_rejected.lock();
        let out = *s;
        s.total_count_change = 0;
        out
    };
    reader.status.clear(StatusMask::SAMPLE_REJECTED);
    Ok(out)
}
