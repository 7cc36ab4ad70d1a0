// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Domain participant: entry point and factory for all other entities.

use super::condition::{HasStatusCondition, StatusCondition};
use super::listener::Listener;
use super::publisher::Publisher;
use super::reader::DataReader;
use super::subscriber::Subscriber;
use super::topic::Topic;
use super::writer::DataWriter;
use crate::builtin::{
    BuiltinTopicKind, ParticipantBuiltinTopicData, PublicationBuiltinTopicData,
    SubscriptionBuiltinTopicData, TopicBuiltinTopicData,
};
use crate::core::guid::Guid;
use crate::core::handles::Handle;
use crate::core::retcode::{ReturnCode, Result};
use crate::core::types::{TopicType, TypeDescriptor};
use crate::graph;
use crate::graph::status::StatusMask;
use crate::qos::Qos;
use std::marker::PhantomData;

/// A domain participant, identified by its handle. Copies refer to the
/// same entity; the entity lives until [`Participant::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    handle: Handle,
}

impl Participant {
    /// Create a participant in `domain_id` with default QoS.
    pub fn new(domain_id: u32) -> Result<Self> {
        Self::with_qos(domain_id, Qos::default(), Listener::new())
    }

    /// Create a participant with explicit QoS and listener.
    pub fn with_qos(domain_id: u32, qos: Qos, listener: Listener) -> Result<Self> {
        let handle = graph::create_participant(domain_id, qos, listener)?;
        Ok(Participant { handle })
    }

    /// Wrap an existing handle (validated on first use).
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Participant { handle }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Register a topic for type `T`.
    pub fn create_topic<T: TopicType>(&self, name: &str, qos: Qos) -> Result<Topic<T>> {
        let desc = TypeDescriptor::of::<T>();
        let handle = graph::create_topic(self.handle, name, &desc, qos, Listener::new())?;
        Ok(Topic::from_handle(handle))
    }

    /// Create a publisher.
    pub fn create_publisher(&self, qos: Qos) -> Result<Publisher> {
        Ok(Publisher::from_handle(graph::create_publisher(
            self.handle,
            qos,
            Listener::new(),
        )?))
    }

    /// Create a subscriber.
    pub fn create_subscriber(&self, qos: Qos) -> Result<Subscriber> {
        Ok(Subscriber::from_handle(graph::create_subscriber(
            self.handle,
            qos,
            Listener::new(),
        )?))
    }

    /// Create a writer under a dedicated publisher.
    pub fn create_writer<T: TopicType>(&self, topic: &Topic<T>, qos: Qos) -> Result<DataWriter<T>> {
        self.create_publisher(Qos::default())?.create_writer(topic, qos)
    }

    /// Create a reader under a dedicated subscriber.
    pub fn create_reader<T: TopicType>(&self, topic: &Topic<T>, qos: Qos) -> Result<DataReader<T>> {
        self.create_subscriber(Qos::default())?.create_reader(topic, qos)
    }

    /// Recursively delete the participant and everything it owns.
    pub fn delete(self) -> Result<()> {
        graph::delete(self.handle)
    }

    pub fn enable(&self) -> Result<()> {
        graph::enable(self.handle)
    }

    pub fn qos(&self) -> Result<Qos> {
        graph::get_qos(self.handle)
    }

    pub fn set_qos(&self, qos: &Qos) -> Result<()> {
        graph::set_qos(self.handle, qos)
    }

    pub fn set_listener(&self, listener: Listener) -> Result<()> {
        graph::set_listener(self.handle, listener)
    }

    pub fn guid(&self) -> Result<Guid> {
        graph::get_guid(self.handle)
    }

    pub fn domain_id(&self) -> Result<u32> {
        graph::get_domain_id(self.handle)
    }

    pub fn instance_handle(&self) -> Result<u64> {
        graph::get_instance_handle(self.handle)
    }

    pub fn children(&self) -> Result<Vec<Handle>> {
        graph::get_children(self.handle)
    }

    pub fn read_status(&self) -> Result<StatusMask> {
        graph::read_status(self.handle)
    }

    pub fn take_status(&self) -> Result<StatusMask> {
        graph::take_status(self.handle)
    }

    fn builtin_handle(&self, kind: BuiltinTopicKind) -> Result<Handle> {
        let record = graph::pin(self.handle)?;
        let pd = record
            .participant_data()
            .ok_or(ReturnCode::BadParameter)?;
        let endpoints = (*pd.builtin.lock()).ok_or(ReturnCode::PreconditionNotMet)?;
        Ok(match kind {
            BuiltinTopicKind::Participant => endpoints.participants,
            BuiltinTopicKind::Topic => endpoints.topics,
            BuiltinTopicKind::Publication => endpoints.publications,
            BuiltinTopicKind::Subscription => endpoints.subscriptions,
        })
    }

    /// Builtin reader mirroring DCPSParticipant.
    pub fn builtin_participants_reader(&self) -> Result<DataReader<ParticipantBuiltinTopicData>> {
        Ok(DataReader {
            handle: self.builtin_handle(BuiltinTopicKind::Participant)?,
            _marker: PhantomData,
        })
    }

    /// Builtin reader mirroring DCPSTopic.
    pub fn builtin_topics_reader(&self) -> Result<DataReader<TopicBuiltinTopicData>> {
        Ok(DataReader {
            handle: self.builtin_handle(BuiltinTopicKind::Topic)?,
            _marker: PhantomData,
        })
    }

    /// Builtin reader mirroring DCPSPublication.
    pub fn builtin_publications_reader(&self) -> Result<DataReader<PublicationBuiltinTopicData>> {
        Ok(DataReader {
            handle: self.builtin_handle(BuiltinTopicKind::Publication)?,
            _marker: PhantomData,
        })
    }

    /// Builtin reader mirroring DCPSSubscription.
    pub fn builtin_subscriptions_reader(&self) -> Result<DataReader<SubscriptionBuiltinTopicData>> {
        Ok(DataReader {
            handle: self.builtin_handle(BuiltinTopicKind::Subscription)?,
            _marker: PhantomData,
        })
    }
}

impl HasStatusCondition for Participant {
    fn status_condition(&self) -> std::sync::Arc<StatusCondition> {
        graph::pin(self.handle)
            .map(|e| e.status.condition())
            .unwrap_or_default()
    }
}
