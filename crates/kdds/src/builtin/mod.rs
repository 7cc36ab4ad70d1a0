// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Builtin topics: the entity graph reflected as DCPS data.
//!
//! Every participant owns four builtin readers (DCPSParticipant,
//! DCPSTopic, DCPSPublication, DCPSSubscription) under a builtin
//! subscriber. Creating a participant, topic, writer or reader publishes
//! the corresponding sample to every participant in the domain; deleting
//! disposes it. Samples are keyed by GUID. A participant created into a
//! populated domain receives a replay of the existing graph, so its
//! builtin readers start complete.
//!
//! The feeding writers are synthetic: one per (participant, builtin
//! topic), with its own sequence counter, so each builtin reader sees a
//! single gap-free stream.

use crate::core::guid::{Guid, GuidKind};
use crate::core::handles::Handle;
use crate::core::retcode::{ReturnCode, Result};
use crate::core::time::Time;
use crate::core::types::{TopicType, TypeDescriptor};
use crate::dds::listener::Listener;
use crate::graph;
use crate::graph::entity::{BuiltinEndpoints, EntityKindTag, EntityRecord};
use crate::qos::{Durability, Qos, Reliability};
use crate::rhc::{IncomingKind, IncomingSample};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The four builtin topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTopicKind {
    Participant,
    Topic,
    Publication,
    Subscription,
}

impl BuiltinTopicKind {
    /// DCPS topic name.
    #[must_use]
    pub const fn topic_name(self) -> &'static str {
        match self {
            BuiltinTopicKind::Participant => "DCPSParticipant",
            BuiltinTopicKind::Topic => "DCPSTopic",
            BuiltinTopicKind::Publication => "DCPSPublication",
            BuiltinTopicKind::Subscription => "DCPSSubscription",
        }
    }

    const fn writer_key(self) -> u32 {
        match self {
            BuiltinTopicKind::Participant => 1,
            BuiltinTopicKind::Topic => 2,
            BuiltinTopicKind::Publication => 3,
            BuiltinTopicKind::Subscription => 4,
        }
    }
}

/// Per-participant sequence counters for the synthetic builtin writers.
#[derive(Default)]
pub struct BuiltinSeq {
    participants: AtomicU64,
    topics: AtomicU64,
    publications: AtomicU64,
    subscriptions: AtomicU64,
}

impl BuiltinSeq {
    fn next(&self, kind: BuiltinTopicKind) -> u64 {
        let counter = match kind {
            BuiltinTopicKind::Participant => &self.participants,
            BuiltinTopicKind::Topic => &self.topics,
            BuiltinTopicKind::Publication => &self.publications,
            BuiltinTopicKind::Subscription => &self.subscriptions,
        };
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn get_bytes(buf: &[u8], at: &mut usize) -> Result<Vec<u8>> {
    if buf.len() < *at + 4 {
        return Err(ReturnCode::BadParameter);
    }
    let len = u32::from_le_bytes(buf[*at..*at + 4].try_into().map_err(|_| ReturnCode::Error)?)
        as usize;
    *at += 4;
    if buf.len() < *at + len {
        return Err(ReturnCode::BadParameter);
    }
    let out = buf[*at..*at + len].to_vec();
    *at += len;
    Ok(out)
}

fn get_string(buf: &[u8], at: &mut usize) -> Result<String> {
    String::from_utf8(get_bytes(buf, at)?).map_err(|_| ReturnCode::BadParameter)
}

/// DCPSParticipant payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantBuiltinTopicData {
    /// Participant GUID.
    pub key: [u8; 16],
}

impl TopicType for ParticipantBuiltinTopicData {
    fn type_name() -> &'static str {
        "DCPS::ParticipantBuiltinTopicData"
    }

    fn has_key() -> bool {
        true
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&self.key);
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 16 {
            return Err(ReturnCode::BadParameter);
        }
        let mut key = [0u8; 16];
        key.copy_from_slice(&buf[..16]);
        Ok(ParticipantBuiltinTopicData { key })
    }

    fn key_bytes(&self) -> Vec<u8> {
        self.key.to_vec()
    }
}

/// DCPSTopic payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBuiltinTopicData {
    /// Topic GUID.
    pub key: [u8; 16],
    pub name: String,
    pub type_name: String,
}

impl TopicType for TopicBuiltinTopicData {
    fn type_name() -> &'static str {
        "DCPS::TopicBuiltinTopicData"
    }

    fn has_key() -> bool {
        true
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&self.key);
        put_bytes(buf, self.name.as_bytes());
        put_bytes(buf, self.type_name.as_bytes());
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 16 {
            return Err(ReturnCode::BadParameter);
        }
        let mut key = [0u8; 16];
        key.copy_from_slice(&buf[..16]);
        let mut at = 16;
        Ok(TopicBuiltinTopicData {
            key,
            name: get_string(buf, &mut at)?,
            type_name: get_string(buf, &mut at)?,
        })
    }

    fn key_bytes(&self) -> Vec<u8> {
        self.key.to_vec()
    }
}

/// DCPSPublication / DCPSSubscription payload (they share the shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointBuiltinTopicData {
    /// Endpoint GUID.
    pub key: [u8; 16],
    /// Owning participant GUID.
    pub participant_key: [u8; 16],
    pub topic_name: String,
    pub type_name: String,
    /// True when the endpoint offers/requests reliable delivery.
    pub reliable: bool,
}

impl EndpointBuiltinTopicData {
    fn encode_impl(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.participant_key);
        put_bytes(buf, self.topic_name.as_bytes());
        put_bytes(buf, self.type_name.as_bytes());
        buf.push(u8::from(self.reliable));
        Ok(())
    }

    fn decode_impl(buf: &[u8]) -> Result<Self> {
        if buf.len() < 32 {
            return Err(ReturnCode::BadParameter);
        }
        let mut key = [0u8; 16];
        key.copy_from_slice(&buf[..16]);
        let mut participant_key = [0u8; 16];
        participant_key.copy_from_slice(&buf[16..32]);
        let mut at = 32;
        let topic_name = get_string(buf, &mut at)?;
        let type_name = get_string(buf, &mut at)?;
        let reliable = buf.get(at).copied().unwrap_or(0) != 0;
        Ok(EndpointBuiltinTopicData {
            key,
            participant_key,
            topic_name,
            type_name,
            reliable,
        })
    }
}

/// DCPSPublication payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationBuiltinTopicData(pub EndpointBuiltinTopicData);

impl TopicType for PublicationBuiltinTopicData {
    fn type_name() -> &'static str {
        "DCPS::PublicationBuiltinTopicData"
    }

    fn has_key() -> bool {
        true
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.0.encode_impl(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        Ok(PublicationBuiltinTopicData(
            EndpointBuiltinTopicData::decode_impl(buf)?,
        ))
    }

    fn key_bytes(&self) -> Vec<u8> {
        self.0.key.to_vec()
    }
}

/// DCPSSubscription payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionBuiltinTopicData(pub EndpointBuiltinTopicData);

impl TopicType for SubscriptionBuiltinTopicData {
    fn type_name() -> &'static str {
        "DCPS::SubscriptionBuiltinTopicData"
    }

    fn has_key() -> bool {
        true
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.0.encode_impl(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        Ok(SubscriptionBuiltinTopicData(
            EndpointBuiltinTopicData::decode_impl(buf)?,
        ))
    }

    fn key_bytes(&self) -> Vec<u8> {
        self.0.key.to_vec()
    }
}

fn builtin_reader_qos() -> Qos {
    Qos::new()
        .with_reliability(Reliability::reliable())
        .with_durability(Durability::TransientLocal)
        .keep_last(1)
}

/// Create the builtin subscriber and its four readers for a participant.
pub(crate) fn create_builtin_endpoints(participant: Handle) -> Result<()> {
    let subscriber = graph::create_subscriber(participant, Qos::default(), Listener::new())?;
    let participants = graph::create_reader_raw(
        subscriber,
        BuiltinTopicKind::Participant.topic_name(),
        &TypeDescriptor::of::<ParticipantBuiltinTopicData>(),
        builtin_reader_qos(),
        Listener::new(),
        true,
    )?;
    let topics = graph::create_reader_raw(
        subscriber,
        BuiltinTopicKind::Topic.topic_name(),
        &TypeDescriptor::of::<TopicBuiltinTopicData>(),
        builtin_reader_qos(),
        Listener::new(),
        true,
    )?;
    let publications = graph::create_reader_raw(
        subscriber,
        BuiltinTopicKind::Publication.topic_name(),
        &TypeDescriptor::of::<PublicationBuiltinTopicData>(),
        builtin_reader_qos(),
        Listener::new(),
        true,
    )?;
    let subscriptions = graph::create_reader_raw(
        subscriber,
        BuiltinTopicKind::Subscription.topic_name(),
        &TypeDescriptor::of::<SubscriptionBuiltinTopicData>(),
        builtin_reader_qos(),
        Listener::new(),
        true,
    )?;

    let record = graph::entities().peek(participant)?;
    let pd = record
        .participant_data()
        .ok_or(ReturnCode::BadParameter)?;
    *pd.builtin.lock() = Some(BuiltinEndpoints {
        participants,
        topics,
        publications,
        subscriptions,
    });

    replay_domain(&record);
    Ok(())
}

/// Feed one builtin sample (or dispose) into a single participant.
fn feed(
    target: &EntityRecord,
    kind: BuiltinTopicKind,
    payload: Option<Arc<[u8]>>,
    key: [u8; 16],
) {
    let Some(pd) = target.participant_data() else {
        return;
    };
    let Some(endpoints) = *pd.builtin.lock() else {
        return;
    };
    let reader = match kind {
        BuiltinTopicKind::Participant => endpoints.participants,
        BuiltinTopicKind::Topic => endpoints.topics,
        BuiltinTopicKind::Publication => endpoints.publications,
        BuiltinTopicKind::Subscription => endpoints.subscriptions,
    };
    let incoming = IncomingSample {
        kind: if payload.is_some() {
            IncomingKind::Data
        } else {
            IncomingKind::Dispose
        },
        payload,
        key: key.to_vec(),
        writer_guid: Guid::new(target.guid.prefix, kind.writer_key(), GuidKind::BuiltinWriter),
        seq: pd.builtin_seq.next(kind),
        source_timestamp: Time::now(),
        expiry: Time(i64::MAX),
    };
    if let Ok(r) = graph::pin(reader) {
        if let Some(rd) = r.reader_data() {
            let _ = rd.rhc.store(incoming);
        }
    }
}

/// Feed every participant in the domain.
fn broadcast(
    domain_id: u32,
    kind: BuiltinTopicKind,
    payload: Option<Arc<[u8]>>,
    key: [u8; 16],
) {
    for handle in graph::domain(domain_id).participant_handles() {
        if let Ok(target) = graph::entities().peek(handle) {
            feed(&target, kind, payload.clone(), key);
        }
    }
}

fn encode_payload<T: TopicType>(value: &T) -> Option<Arc<[u8]>> {
    let mut buf = Vec::new();
    value.encode(&mut buf).ok()?;
    Some(Arc::from(buf.into_boxed_slice()))
}

fn participant_payload(record: &EntityRecord) -> (Option<Arc<[u8]>>, [u8; 16]) {
    let key = record.guid.to_bytes();
    (
        encode_payload(&ParticipantBuiltinTopicData { key }),
        key,
    )
}

fn topic_payload(record: &EntityRecord) -> Option<(Option<Arc<[u8]>>, [u8; 16])> {
    let td = record.topic_data()?;
    let key = record.guid.to_bytes();
    let data = TopicBuiltinTopicData {
        key,
        name: td.name.clone(),
        type_name: td.type_desc.type_name.clone(),
    };
    Some((encode_payload(&data), key))
}

fn endpoint_payload(record: &EntityRecord) -> Option<EndpointBuiltinTopicData> {
    let participant = graph::get_participant(record.handle).ok()?;
    let participant_key = graph::entities().peek(participant).ok()?.guid.to_bytes();
    let (topic_name, type_name) = match (record.writer_data(), record.reader_data()) {
        (Some(wd), _) => (wd.topic_name.clone(), wd.type_desc.type_name.clone()),
        (_, Some(rd)) => (rd.topic_name.clone(), rd.type_desc.type_name.clone()),
        _ => return None,
    };
    Some(EndpointBuiltinTopicData {
        key: record.guid.to_bytes(),
        participant_key,
        topic_name,
        type_name,
        reliable: record.qos.read().reliability.is_reliable(),
    })
}

pub(crate) fn publish_participant(record: &EntityRecord) {
    let (payload, key) = participant_payload(record);
    broadcast(record.domain_id, BuiltinTopicKind::Participant, payload, key);
}

pub(crate) fn dispose_participant(record: &EntityRecord) {
    broadcast(
        record.domain_id,
        BuiltinTopicKind::Participant,
        None,
        record.guid.to_bytes(),
    );
}

pub(crate) fn publish_topic(record: &EntityRecord) {
    if let Some((payload, key)) = topic_payload(record) {
        broadcast(record.domain_id, BuiltinTopicKind::Topic, payload, key);
    }
}

pub(crate) fn dispose_topic(record: &EntityRecord) {
    broadcast(
        record.domain_id,
        BuiltinTopicKind::Topic,
        None,
        record.guid.to_bytes(),
    );
}

pub(crate) fn publish_publication(record: &EntityRecord) {
    if let Some(data) = endpoint_payload(record) {
        let key = data.key;
        let payload = encode_payload(&PublicationBuiltinTopicData(data));
        broadcast(record.domain_id, BuiltinTopicKind::Publication, payload, key);
    }
}

pub(crate) fn dispose_publication(record: &EntityRecord) {
    broadcast(
        record.domain_id,
        BuiltinTopicKind::Publication,
        None,
        record.guid.to_bytes(),
    );
}

pub(crate) fn publish_subscription(record: &EntityRecord) {
    if let Some(data) = endpoint_payload(record) {
        let key = data.key;
        let payload = encode_payload(&SubscriptionBuiltinTopicData(data));
        broadcast(record.domain_id, BuiltinTopicKind::Subscription, payload, key);
    }
}

pub(crate) fn dispose_subscription(record: &EntityRecord) {
    broadcast(
        record.domain_id,
        BuiltinTopicKind::Subscription,
        None,
        record.guid.to_bytes(),
    );
}

/// Replay the existing domain graph into a freshly created participant,
/// so late joiners observe a complete picture.
fn replay_domain(new_participant: &EntityRecord) {
    let dom = graph::domain(new_participant.domain_id);
    for handle in dom.participant_handles() {
        if handle == new_participant.handle {
            continue;
        }
        let Ok(peer) = graph::entities().peek(handle) else {
            continue;
        };
        if !peer.is_enabled() {
            continue;
        }
        let (payload, key) = participant_payload(&peer);
        feed(new_participant, BuiltinTopicKind::Participant, payload, key);

        for child in peer.children.lock().clone() {
            let Ok(child_record) = graph::entities().peek(child) else {
                continue;
            };
            match child_record.tag() {
                EntityKindTag::Topic if child_record.is_enabled() => {
                    if let Some((payload, key)) = topic_payload(&child_record) {
                        feed(new_participant, BuiltinTopicKind::Topic, payload, key);
                    }
                }
                EntityKindTag::Publisher | EntityKindTag::Subscriber => {
                    for endpoint in child_record.children.lock().clone() {
                        let Ok(ep) = graph::entities().peek(endpoint) else {
                            continue;
                        };
                        if !ep.is_enabled() {
                            continue;
                        }
                        match ep.tag() {
                            EntityKindTag::Writer => {
                                if let Some(data) = endpoint_payload(&ep) {
                                    let key = data.key;
                                    let payload =
                                        encode_payload(&PublicationBuiltinTopicData(data));
                                    feed(
                                        new_participant,
                                        BuiltinTopicKind::Publication,
                                        payload,
                                        key,
                                    );
                                }
                            }
                            EntityKindTag::Reader => {
                                let is_builtin =
                                    ep.reader_data().map(|rd| rd.builtin).unwrap_or(true);
                                if is_builtin {
                                    continue;
                                }
                                if let Some(data) = endpoint_payload(&ep) {
                                    let key = data.key;
                                    let payload =
                                        encode_payload(&SubscriptionBuiltinTopicData(data));
                                    feed(
                                        new_participant,
                                        BuiltinTopicKind::Subscription,
                                        payload,
                                        key,
                                    );
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
