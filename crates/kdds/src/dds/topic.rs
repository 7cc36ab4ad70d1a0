// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Topic: a named type under a participant.

use crate::core::handles::Handle;
use crate::core::retcode::{ReturnCode, Result};
use crate::core::types::TopicType;
use crate::graph;
use crate::qos::Qos;
use std::marker::PhantomData;

/// A typed topic handle.
pub struct Topic<T> {
    pub(crate) handle: Handle,
    pub(crate) _marker: PhantomData<T>,
}

// Manual impls: the wrapper is a plain handle regardless of `T`.
impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Topic<T> {}

impl<T> PartialEq for Topic<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for Topic<T> {}

impl<T> std::fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic").field("handle", &self.handle).finish()
    }
}

impl<T: TopicType> Topic<T> {
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Topic {
            handle,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The registered topic name.
    pub fn name(&self) -> Result<String> {
        let record = graph::pin(self.handle)?;
        let td = record.topic_data().ok_or(ReturnCode::BadParameter)?;
        Ok(td.name.clone())
    }

    /// The registered type name.
    pub fn type_name(&self) -> Result<String> {
        let record = graph::pin(self.handle)?;
        let td = record.topic_data().ok_or(ReturnCode::BadParameter)?;
        Ok(td.type_desc.type_name.clone())
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
