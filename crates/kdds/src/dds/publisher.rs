// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Publisher: grouping entity for data writers. Carries the partition
//! its writers match under.

use super::listener::Listener;
use super::topic::Topic;
use super::writer::DataWriter;
use crate::core::handles::Handle;
use crate::core::retcode::Result;
use crate::core::types::TopicType;
use crate::graph;
use crate::qos::Qos;
use std::marker::PhantomData;

/// A publisher handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publisher {
    pub(crate) handle: Handle,
}

impl Publisher {
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Publisher { handle }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Create a data writer for `topic`.
    pub fn create_writer<T: TopicType>(&self, topic: &Topic<T>, qos: Qos) -> Result<DataWriter<T>> {
        self.create_writer_with_listener(topic, qos, Listener::new())
    }

    /// Create a data writer with a listener.
    pub fn create_writer_with_listener<T: TopicType>(
        &self,
        topic: &Topic<T>,
        qos: Qos,
        listener: Listener,
    ) -> Result<DataWriter<T>> {
        let handle = graph::create_writer(self.handle, topic.handle(), qos, listener)?;
        Ok(DataWriter {
            handle,
            _marker: PhantomData,
        })
    }

    pub fn qos(&self) -> Result<Qos> {
        graph::get_qos(self.handle)
    }

    pub fn set_qos(&self, qos: &Qos) -> Result<()> {
        graph::set_qos(self.handle, qos)
    }

    pub fn enable(&self) -> Result<()> {
        graph::enable(self.handle)
    }

    pub fn delete(self) -> Result<()> {
        graph::delete(self.handle)
    }
}
