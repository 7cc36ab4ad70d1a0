// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Subscriber: grouping entity for data readers. Carries the partition
//! its readers match under.

use super::listener::Listener;
use super::reader::DataReader;
use super::topic::Topic;
use crate::core::handles::Handle;
use crate::core::retcode::Result;
use crate::core::types::TopicType;
use crate::graph;
use crate::qos::Qos;
use std::marker::PhantomData;

/// A subscriber handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscriber {
    pub(crate) handle: Handle,
}

impl Subscriber {
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Subscriber { handle }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Create a data reader for `topic`.
    pub fn create_reader<T: TopicType>(&self, topic: &Topic<T>, qos: Qos) -> Result<DataReader<T>> {
        self.create_reader_with_listener(topic, qos, Listener::new())
    }

    /// Create a data reader with a listener.
    pub fn create_reader_with_listener<T: TopicType>(
        &self,
        topic: &Topic<T>,
        qos: Qos,
        listener: Listener,
    ) -> Result<DataReader<T>> {
        let handle = graph::create_reader(self.handle, topic.handle(), qos, listener)?;
        Ok(DataReader {
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
