// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Typed data reader with read/take access over the history cache.

use super::condition::{HasStatusCondition, StatusCondition};
use super::listener::Listener;
use super::read_condition::{QueryCondition, ReadCondition};
use crate::core::handles::Handle;
use crate::core::retcode::{ReturnCode, Result};
use crate::core::types::TopicType;
use crate::graph;
use crate::graph::status::{
    IncompatibleQosStatus, SampleLostStatus, SampleRejectedStatus, SubscriptionMatchedStatus,
};
use crate::qos::Qos;
use crate::rhc::{
    InstanceStateMask, RawSample, SampleInfo, SampleStateMask, StateMask, ViewStateMask,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// One decoded sample with its metadata. `data` is `None` for
/// dispose/unregister sentinels (`info.valid_data == false`).
#[derive(Debug, Clone)]
pub struct Sample<T> {
    pub data: Option<T>,
    pub info: SampleInfo,
}

/// A typed data reader handle.
pub struct DataReader<T> {
    pub(crate) handle: Handle,
    pub(crate) _marker: PhantomData<T>,
}

// Manual impls: the wrapper is a plain handle regardless of `T`.
impl<T> Clone for DataReader<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DataReader<T> {}

impl<T> PartialEq for DataReader<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for DataReader<T> {}

impl<T> std::fmt::Debug for DataReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("handle", &self.handle)
            .finish()
    }
}

impl<T: TopicType> DataReader<T> {
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        DataReader {
            handle,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    fn decode(raw: Vec<RawSample>) -> Result<Vec<Sample<T>>> {
        raw.into_iter()
            .map(|s| {
                let data = match s.payload {
                    Some(payload) => Some(T::decode(&payload)?),
                    None => None,
                };
                Ok(Sample { data, info: s.info })
            })
            .collect()
    }

    /// Copy up to `max` samples, marking them READ.
    pub fn read(&self, max: usize) -> Result<Vec<Sample<T>>> {
        self.read_mask(max, StateMask::ANY)
    }

    /// Remove and return up to `max` samples.
    pub fn take(&self, max: usize) -> Result<Vec<Sample<T>>> {
        self.take_mask(max, StateMask::ANY)
    }

    /// `read` restricted to a state mask.
    pub fn read_mask(&self, max: usize, mask: StateMask) -> Result<Vec<Sample<T>>> {
        let record = graph::pin(self.handle)?;
        Self::decode(graph::reader_access(&record, max, mask, None, None, false)?)
    }

    /// `take` restricted to a state mask.
    pub fn take_mask(&self, max: usize, mask: StateMask) -> Result<Vec<Sample<T>>> {
        let record = graph::pin(self.handle)?;
        Self::decode(graph::reader_access(&record, max, mask, None, None, true)?)
    }

    /// Read the next unread sample, if any.
    pub fn read_next(&self) -> Result<Option<Sample<T>>> {
        match self.read_mask(1, StateMask::NOT_READ) {
            Ok(mut samples) => Ok(samples.pop()),
            Err(ReturnCode::NoData) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Take the next sample, if any.
    pub fn take_next(&self) -> Result<Option<Sample<T>>> {
        match self.take_mask(1, StateMask::ANY) {
            Ok(mut samples) => Ok(samples.pop()),
            Err(ReturnCode::NoData) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Read samples of one instance.
    pub fn read_instance(
        &self,
        instance: u64,
        max: usize,
        mask: StateMask,
    ) -> Result<Vec<Sample<T>>> {
        let record = graph::pin(self.handle)?;
        Self::decode(graph::reader_access(
            &record,
            max,
            mask,
            None,
            Some(instance),
            false,
        )?)
    }

    /// Take samples of one instance.
    pub fn take_instance(
        &self,
        instance: u64,
        max: usize,
        mask: StateMask,
    ) -> Result<Vec<Sample<T>>> {
        let record = graph::pin(self.handle)?;
        Self::decode(graph::reader_access(
            &record,
            max,
            mask,
            None,
            Some(instance),
            true,
        )?)
    }

    /// Resolve the instance handle for a key value, if the reader has
    /// seen the instance.
    pub fn lookup_instance(&self, value: &T) -> Result<Option<u64>> {
        let record = graph::pin(self.handle)?;
        let rd = record.reader_data().ok_or(ReturnCode::BadParameter)?;
        Ok(rd.rhc.lookup_instance(&value.key_bytes()))
    }

    /// Create a read condition over the given state masks.
    pub fn create_read_condition(
        &self,
        sample_mask: SampleStateMask,
        view_mask: ViewStateMask,
        instance_mask: InstanceStateMask,
    ) -> Result<ReadCondition> {
        let record = graph::pin(self.handle)?;
        let core =
            graph::create_read_condition(&record, sample_mask, view_mask, instance_mask, None)?;
        Ok(ReadCondition {
            core,
            reader: self.handle,
        })
    }

    /// Create a query condition: a read condition plus a content
    /// predicate over the decoded sample.
    pub fn create_query_condition<F>(
        &self,
        sample_mask: SampleStateMask,
        view_mask: ViewStateMask,
        instance_mask: InstanceStateMask,
        predicate: F,
    ) -> Result<QueryCondition>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let record = graph::pin(self.handle)?;
        let erased = Box::new(move |payload: &[u8]| match T::decode(payload) {
            Ok(value) => predicate(&value),
            Err(_) => false,
        });
        let core = graph::create_read_condition(
            &record,
            sample_mask,
            view_mask,
            instance_mask,
            Some(erased),
        )?;
        Ok(QueryCondition {
            base: ReadCondition {
                core,
                reader: self.handle,
            },
        })
    }

    /// Delete a read/query condition created on this reader.
    pub fn delete_read_condition(&self, condition: &ReadCondition) -> Result<()> {
        if condition.reader != self.handle {
            return Err(ReturnCode::PreconditionNotMet);
        }
        let record = graph::pin(self.handle)?;
        graph::remove_read_condition(&record, condition.core.id())
    }

    /// Read the samples selected by a read/query condition.
    pub fn read_with_condition(
        &self,
        max: usize,
        condition: &ReadCondition,
    ) -> Result<Vec<Sample<T>>> {
        if condition.reader != self.handle {
            return Err(ReturnCode::PreconditionNotMet);
        }
        let record = graph::pin(self.handle)?;
        Self::decode(graph::reader_access(
            &record,
            max,
            condition.core.masks(),
            Some(&condition.core),
            None,
            false,
        )?)
    }

    /// Take the samples selected by a read/query condition.
    pub fn take_with_condition(
        &self,
        max: usize,
        condition: &ReadCondition,
    ) -> Result<Vec<Sample<T>>> {
        if condition.reader != self.handle {
            return Err(ReturnCode::PreconditionNotMet);
        }
        let record = graph::pin(self.handle)?;
        Self::decode(graph::reader_access(
            &record,
            max,
            condition.core.masks(),
            Some(&condition.core),
            None,
            true,
        )?)
    }

    /// SUBSCRIPTION_MATCHED status; consuming resets the change counts.
    pub fn subscription_matched_status(&self) -> Result<SubscriptionMatchedStatus> {
        let record = graph::pin(self.handle)?;
        graph::subscription_matched_status(&record)
    }

    /// REQUESTED_INCOMPATIBLE_QOS status; consuming resets the change count.
    pub fn requested_incompatible_qos_status(&self) -> Result<IncompatibleQosStatus> {
        let record = graph::pin(self.handle)?;
        graph::requested_incompatible_qos_status(&record)
    }

    /// SAMPLE_LOST status; consuming resets the change count.
    pub fn sample_lost_status(&self) -> Result<SampleLostStatus> {
        let record = graph::pin(self.handle)?;
        graph::sample_lost_status(&record)
    }

    /// SAMPLE_REJECTED status; consuming resets the change count.
    pub fn sample_rejected_status(&self) -> Result<SampleRejectedStatus> {
        let record = graph::pin(self.handle)?;
        graph::sample_rejected_status(&record)
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

impl<T> HasStatusCondition for DataReader<T> {
    fn status_condition(&self) -> Arc<StatusCondition> {
        graph::pin(self.handle)
            .map(|e| e.status.condition())
            .unwrap_or_default()
    }
}
