// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Entity records held by the handle table.
//!
//! One record per entity; the kind-specific payload lives in an enum so
//! the handle-table lookup yields everything an operation needs. Parent
//! links are immutable after construction; children are tracked for the
//! recursive post-order delete.

use super::domain::DomainState;
use super::status::{
    EntityStatus, IncompatibleQosStatus, PublicationMatchedStatus, SampleLostStatus,
    SampleRejectedStatus, SubscriptionMatchedStatus,
};
use crate::core::guid::Guid;
use crate::core::handles::Handle;
use crate::core::types::TypeDescriptor;
use crate::dds::listener::{Dispatcher, Listener};
use crate::qos::Qos;
use crate::rhc::{ReadConditionCore, ReaderCache};
use crate::whc::WriterCache;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU32};
use std::sync::Arc;

/// Discriminates entity kinds without touching the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKindTag {
    Participant,
    Topic,
    Publisher,
    Subscriber,
    Writer,
    Reader,
}

/// A reader matched to a writer (writer-side bookkeeping).
#[derive(Debug, Clone, Copy)]
pub struct MatchedReader {
    pub handle: Handle,
    pub guid: Guid,
    pub reliable: bool,
}

/// A writer matched to a reader (reader-side bookkeeping).
#[derive(Debug, Clone, Copy)]
pub struct MatchedWriter {
    pub handle: Handle,
    pub guid: Guid,
}

/// Builtin reader handles owned by a participant.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinEndpoints {
    pub participants: Handle,
    pub topics: Handle,
    pub publications: Handle,
    pub subscriptions: Handle,
}

/// Participant payload.
pub struct ParticipantData {
    pub domain: Arc<DomainState>,
    pub dispatcher: Dispatcher,
    pub builtin: Mutex<Option<BuiltinEndpoints>>,
    /// Sequence counters for the synthetic builtin-topic writers feeding
    /// this participant's builtin readers.
    pub builtin_seq: crate::builtin::BuiltinSeq,
    /// Allocator for the entity-key part of child GUIDs.
    pub entity_key_counter: AtomicU32,
}

/// Topic payload.
pub struct TopicData {
    pub name: String,
    pub type_desc: Arc<TypeDescriptor>,
}

/// Writer payload.
pub struct WriterData {
    pub topic_name: String,
    pub type_desc: Arc<TypeDescriptor>,
    pub whc: WriterCache,
    pub matched: Mutex<Vec<MatchedReader>>,
    pub publication_matched: Mutex<PublicationMatchedStatus>,
    pub offered_incompatible: Mutex<IncompatibleQosStatus>,
}

/// Reader payload.
pub struct ReaderData {
    pub topic_name: String,
    pub type_desc: Arc<TypeDescriptor>,
    pub rhc: ReaderCache,
    pub matched: Mutex<Vec<MatchedWriter>>,
    pub subscription_matched: Mutex<SubscriptionMatchedStatus>,
    pub requested_incompatible: Mutex<IncompatibleQosStatus>,
    pub sample_lost: Mutex<SampleLostStatus>,
    pub sample_rejected: Mutex<SampleRejectedStatus>,
    /// Strong owners of the reader's read/query conditions; the cache
    /// keeps weak references.
    pub conditions: Mutex<Vec<Arc<ReadConditionCore>>>,
    /// Builtin readers mirror the graph and take no part in matching.
    pub builtin: bool,
}

/// Kind-specific payload.
pub enum EntityKind {
    Participant(ParticipantData),
    Topic(TopicData),
    Publisher,
    Subscriber,
    Writer(WriterData),
    Reader(ReaderData),
}

/// The per-entity record.
pub struct EntityRecord {
    pub handle: Handle,
    pub guid: Guid,
    /// Opaque instance id (also the entity's instance handle).
    pub iid: u64,
    pub domain_id: u32,
    /// Immutable after construction.
    pub parent: Option<Handle>,
    pub status: EntityStatus,
    pub listener: Mutex<Listener>,
    pub enabled: AtomicBool,
    pub qos: RwLock<Qos>,
    pub children: Mutex<Vec<Handle>>,
    pub kind: EntityKind,
}

impl EntityRecord {
    #[must_use]
    pub fn tag(&self) -> EntityKindTag {
        match &self.kind {
            EntityKind::Participant(_) => EntityKindTag::Participant,
            EntityKind::Topic(_) => EntityKindTag::Topic,
            EntityKind::Publisher => EntityKindTag::Publisher,
            EntityKind::Subscriber => EntityKindTag::Subscriber,
            EntityKind::Writer(_) => EntityKindTag::Writer,
            EntityKind::Reader(_) => EntityKindTag::Reader,
        }
    }

    #[must_use]
    pub fn participant_data(&self) -> Option<&ParticipantData> {
        match &self.kind {
            EntityKind::Participant(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn topic_data(&self) -> Option<&TopicData> {
        match &self.kind {
            EntityKind::Topic(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn writer_data(&self) -> Option<&WriterData> {
        match &self.kind {
            EntityKind::Writer(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn reader_data(&self) -> Option<&ReaderData> {
        match &self.kind {
            EntityKind::Reader(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn add_child(&self, child: Handle) {
        self.children.lock().push(child);
    }

    pub fn remove_child(&self, child: Handle) {
        self.children.lock().retain(|h| *h != child);
    }
}
