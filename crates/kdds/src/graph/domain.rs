// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Per-domain state: topic registry and the endpoint matching engine.
//!
//! Every local writer and reader registers an endpoint entry with its
//! effective QoS (the partition comes from the owning publisher or
//! subscriber). Registration, QoS requalification and removal drive the
//! match/unmatch events that bind writers to readers for in-process
//! delivery; the same events feed the matched statuses and the builtin
//! topics.

use super::entity::EntityKindTag;
use crate::core::handles::Handle;
use crate::core::guid::Guid;
use crate::core::retcode::{ReturnCode, Result};
use crate::core::types::{TypeDescriptor, TypeId};
use crate::qos::{match_qos, PolicyId, Qos};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A (domain, topic-name) registration. The descriptor is immutable for
/// the lifetime of the registration.
pub struct RegisteredTopic {
    pub desc: Arc<TypeDescriptor>,
    refcount: usize,
}

/// One local endpoint visible to the matcher.
#[derive(Clone)]
pub struct EndpointEntry {
    pub handle: Handle,
    pub guid: Guid,
    pub kind: EntityKindTag,
    pub topic_name: String,
    pub type_id: TypeId,
    /// Effective QoS: endpoint policies with the group's partition.
    pub qos: Qos,
    pub participant: Handle,
}

/// All per-domain shared state.
pub struct DomainState {
    pub domain_id: u32,
    topics: Mutex<HashMap<String, RegisteredTopic>>,
    endpoints: Mutex<Vec<EndpointEntry>>,
    pub participants: Mutex<Vec<Handle>>,
}

impl DomainState {
    #[must_use]
    pub fn new(domain_id: u32) -> Self {
        DomainState {
            domain_id,
            topics: Mutex::new(HashMap::new()),
            endpoints: Mutex::new(Vec::new()),
            participants: Mutex::new(Vec::new()),
        }
    }

    /// Register a topic name against a type descriptor. A second
    /// registration with a conflicting descriptor is refused.
    pub fn register_topic(&self, name: &str, desc: &Arc<TypeDescriptor>) -> Result<()> {
        let mut topics = self.topics.lock();
        if let Some(existing) = topics.get_mut(name) {
            if !existing.desc.compatible_with(desc) {
                log::debug!(
                    "[DOMAIN] topic {:?} re-registered with conflicting type {}",
                    name,
                    desc.type_name
                );
                return Err(ReturnCode::InconsistentPolicy);
            }
            existing.refcount += 1;
            return Ok(());
        }
        topics.insert(
            name.to_string(),
            RegisteredTopic {
                desc: Arc::clone(desc),
                refcount: 1,
            },
        );
        Ok(())
    }

    /// Drop one topic registration; the name is reclaimed at zero.
    pub fn release_topic(&self, name: &str) {
        let mut topics = self.topics.lock();
        if let Some(existing) = topics.get_mut(name) {
            existing.refcount -= 1;
            if existing.refcount == 0 {
                topics.remove(name);
            }
        }
    }

    /// Descriptor registered under a topic name, if any.
    #[must_use]
    pub fn lookup_topic(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.topics.lock().get(name).map(|t| Arc::clone(&t.desc))
    }

    /// Register an endpoint and evaluate it against every opposite
    /// endpoint on the same topic and type.
    pub fn register_endpoint(&self, entry: EndpointEntry) {
        let peers: Vec<EndpointEntry> = {
            let mut endpoints = self.endpoints.lock();
            let peers = endpoints
                .iter()
                .filter(|peer| {
                    peer.kind != entry.kind
                        && peer.topic_name == entry.topic_name
                        && peer.type_id == entry.type_id
                })
                .cloned()
                .collect();
            endpoints.push(entry.clone());
            peers
        };
        for peer in peers {
            let (writer, reader) = orient(&entry, &peer);
            evaluate_pair(writer, reader);
        }
    }

    /// Remove an endpoint entry (matching teardown is driven by the
    /// entity's matched lists).
    pub fn unregister_endpoint(&self, handle: Handle) {
        self.endpoints.lock().retain(|e| e.handle != handle);
    }

    /// Re-run matching for an endpoint after a mutable QoS change.
    pub fn requalify_endpoint(&self, handle: Handle, qos: Qos) {
        let (entry, peers): (Option<EndpointEntry>, Vec<EndpointEntry>) = {
            let mut endpoints = self.endpoints.lock();
            let mut updated = None;
            for e in endpoints.iter_mut() {
                if e.handle == handle {
                    e.qos = qos.clone();
                    updated = Some(e.clone());
                    break;
                }
            }
            let peers = match &updated {
                Some(entry) => endpoints
                    .iter()
                    .filter(|peer| {
                        peer.kind != entry.kind
                            && peer.topic_name == entry.topic_name
                            && peer.type_id == entry.type_id
                    })
                    .cloned()
                    .collect(),
                None => Vec::new(),
            };
            (updated, peers)
        };
        let Some(entry) = entry else { return };
        for peer in peers {
            let (writer, reader) = orient(&entry, &peer);
            requalify_pair(writer, reader);
        }
    }

    /// Snapshot of the effective QoS stored for an endpoint.
    #[must_use]
    pub fn endpoint_qos(&self, handle: Handle) -> Option<Qos> {
        self.endpoints
            .lock()
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.qos.clone())
    }

    /// Reader endpoints owned by a participant (housekeeping sweep).
    #[must_use]
    pub fn reader_endpoints_of(&self, participant: Handle) -> Vec<Handle> {
        self.endpoints
            .lock()
            .iter()
            .filter(|e| e.kind == EntityKindTag::Reader && e.participant == participant)
            .map(|e| e.handle)
            .collect()
    }

    pub fn add_participant(&self, handle: Handle) {
        self.participants.lock().push(handle);
    }

    pub fn remove_participant(&self, handle: Handle) {
        self.participants.lock().retain(|h| *h != handle);
    }

    /// Participants currently in the domain.
    #[must_use]
    pub fn participant_handles(&self) -> Vec<Handle> {
        self.participants.lock().clone()
    }
}

fn orient<'a>(a: &'a EndpointEntry, b: &'a EndpointEntry) -> (&'a EndpointEntry, &'a EndpointEntry) {
    if a.kind == EntityKindTag::Writer {
        (a, b)
    } else {
        (b, a)
    }
}

fn evaluate_pair(writer: &EndpointEntry, reader: &EndpointEntry) {
    match match_qos(&reader.qos, &writer.qos) {
        None => super::apply_match(writer, reader),
        Some(policy) => apply_incompatible(writer, reader, policy),
    }
}

fn requalify_pair(writer: &EndpointEntry, reader: &EndpointEntry) {
    let already = super::is_matched(writer.handle, reader.handle);
    match (match_qos(&reader.qos, &writer.qos), already) {
        (None, false) => super::apply_match(writer, reader),
        (None, true) => {}
        (Some(policy), false) => apply_incompatible(writer, reader, policy),
        (Some(policy), true) => {
            super::apply_unmatch(writer.handle, reader.handle, writer.guid);
            apply_incompatible(writer, reader, policy);
        }
    }
}

fn apply_incompatible(writer: &EndpointEntry, reader: &EndpointEntry, policy: PolicyId) {
    super::apply_incompatible_qos(writer.handle, reader.handle, policy);
}
