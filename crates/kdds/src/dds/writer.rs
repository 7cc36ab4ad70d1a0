// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Typed data writer.

use super::condition::{HasStatusCondition, StatusCondition};
use super::listener::Listener;
use crate::core::handles::Handle;
use crate::core::retcode::{ReturnCode, Result};
use crate::core::time::{Duration, Time};
use crate::core::types::TopicType;
use crate::graph;
use crate::graph::status::{IncompatibleQosStatus, PublicationMatchedStatus};
use crate::qos::Qos;
use crate::rhc::IncomingKind;
use std::marker::PhantomData;
use std::sync::Arc;

/// A typed data writer handle.
pub struct DataWriter<T> {
    pub(crate) handle: Handle,
    pub(crate) _marker: PhantomData<T>,
}

// Manual impls: the wrapper is a plain handle regardless of `T`.
impl<T> Clone for DataWriter<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DataWriter<T> {}

impl<T> PartialEq for DataWriter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for DataWriter<T> {}

impl<T> std::fmt::Debug for DataWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataWriter")
            .field("handle", &self.handle)
            .finish()
    }
}

impl<T: TopicType> DataWriter<T> {
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        DataWriter {
            handle,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    fn serialize(value: &T) -> Result<Arc<[u8]>> {
        let mut buf = Vec::new();
        value.encode(&mut buf)?;
        Ok(Arc::from(buf.into_boxed_slice()))
    }

    /// Publish a sample with the current wall-clock timestamp.
    pub fn write(&self, value: &T) -> Result<()> {
        self.write_with_timestamp(value, Time::now())
    }

    /// Publish a sample with an explicit source timestamp.
    pub fn write_with_timestamp(&self, value: &T, timestamp: Time) -> Result<()> {
        let record = graph::pin(self.handle)?;
        graph::write_message(
            &record,
            IncomingKind::Data,
            Some(Self::serialize(value)?),
            value.key_bytes(),
            timestamp,
        )?;
        Ok(())
    }

    /// Dispose the instance identified by `value`'s key fields.
    pub fn dispose(&self, value: &T) -> Result<()> {
        self.dispose_with_timestamp(value, Time::now())
    }

    pub fn dispose_with_timestamp(&self, value: &T, timestamp: Time) -> Result<()> {
        let record = graph::pin(self.handle)?;
        graph::write_message(
            &record,
            IncomingKind::Dispose,
            None,
            value.key_bytes(),
            timestamp,
        )?;
        Ok(())
    }

    /// Unregister the instance identified by `value`'s key fields.
    pub fn unregister_instance(&self, value: &T) -> Result<()> {
        self.unregister_instance_with_timestamp(value, Time::now())
    }

    pub fn unregister_instance_with_timestamp(&self, value: &T, timestamp: Time) -> Result<()> {
        let record = graph::pin(self.handle)?;
        graph::write_message(
            &record,
            IncomingKind::Unregister,
            None,
            value.key_bytes(),
            timestamp,
        )?;
        Ok(())
    }

    /// Pre-register an instance, returning its writer-local handle.
    pub fn register_instance(&self, value: &T) -> Result<u64> {
        let record = graph::pin(self.handle)?;
        if !record.is_enabled() {
            return Err(ReturnCode::NotEnabled);
        }
        let wd = record.writer_data().ok_or(ReturnCode::BadParameter)?;
        Ok(wd.whc.register_instance(value.key_bytes()))
    }

    /// Look up the instance handle for a key value.
    pub fn lookup_instance(&self, value: &T) -> Result<Option<u64>> {
        let record = graph::pin(self.handle)?;
        let wd = record.writer_data().ok_or(ReturnCode::BadParameter)?;
        Ok(wd.whc.lookup_instance(&value.key_bytes()))
    }

    /// Block until every matched reliable reader acknowledged all
    /// published samples, or the timeout elapses.
    pub fn wait_for_acknowledgments(&self, timeout: Duration) -> Result<()> {
        let record = graph::pin(self.handle)?;
        graph::wait_for_acknowledgments(&record, timeout)
    }

    /// PUBLICATION_MATCHED status; consuming resets the change counts.
    pub fn publication_matched_status(&self) -> Result<PublicationMatchedStatus> {
        let record = graph::pin(self.handle)?;
        graph::publication_matched_status(&record)
    }

    /// OFFERED_INCOMPATIBLE_QOS status; consuming resets the change count.
    pub fn offered_incompatible_qos_status(&self) -> Result<IncompatibleQosStatus> {
        let record = graph::pin(self.handle)?;
        graph::offered_incompatible_qos_status(&record)
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

    pub fn enable(&self) -> Result<()> {
        graph::enable(self.handle)
    }

    pub fn instance_handle(&self) -> Result<u64> {
        graph::get_instance_handle(self.handle)
    }

    pub fn read_status(&self) -> Result<crate::graph::status::StatusMask> {
        graph::read_status(self.handle)
    }

    pub fn take_status(&self) -> Result<crate::graph::status::StatusMask> {
        graph::take_status(self.handle)
    }

    pub fn delete(self) -> Result<()> {
        graph::delete(self.handle)
    }
}

impl<T> HasStatusCondition for DataWriter<T> {
    fn status_condition(&self) -> Arc<StatusCondition> {
        graph::pin(self.handle)
            .map(|e| e.status.condition())
            .unwrap_or_default()
    }
}
