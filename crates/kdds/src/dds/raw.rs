// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Raw handle facade.
//!
//! Preserves the classic DDS C convention: every operation returns a
//! signed 32-bit integer where a positive value is an entity handle,
//! zero is success, and a negative value is `-retcode`. Payloads cross
//! this boundary serialized; the key is extracted through the topic's
//! type descriptor.

use crate::core::handles::Handle;
use crate::core::retcode::ReturnCode;
use crate::core::time::Time;
use crate::core::types::TypeDescriptor;
use crate::dds::listener::Listener;
use crate::graph;
use crate::graph::status::StatusMask;
use crate::qos::Qos;
use crate::rhc::{IncomingKind, RawSample, StateMask};
use std::sync::Arc;

/// Raw operation result: handle, zero, or `-retcode`.
pub type RawHandle = i32;

fn ret(result: crate::core::retcode::Result<()>) -> RawHandle {
    match result {
        Ok(()) => 0,
        Err(code) => code.as_raw(),
    }
}

fn ret_handle(result: crate::core::retcode::Result<Handle>) -> RawHandle {
    match result {
        Ok(handle) => handle.raw(),
        Err(code) => code.as_raw(),
    }
}

/// Create a participant; returns its handle or a negative retcode.
pub fn create_participant(domain_id: u32, qos: &Qos) -> RawHandle {
    ret_handle(graph::create_participant(domain_id, qos.clone(), Listener::new()))
}

/// Create a topic under a participant.
pub fn create_topic(
    participant: RawHandle,
    name: &str,
    desc: &Arc<TypeDescriptor>,
    qos: &Qos,
) -> RawHandle {
    ret_handle(graph::create_topic(
        Handle::from_raw(participant),
        name,
        desc,
        qos.clone(),
        Listener::new(),
    ))
}

/// Create a publisher under a participant.
pub fn create_publisher(participant: RawHandle, qos: &Qos) -> RawHandle {
    ret_handle(graph::create_publisher(
        Handle::from_raw(participant),
        qos.clone(),
        Listener::new(),
    ))
}

/// Create a subscriber under a participant.
pub fn create_subscriber(participant: RawHandle, qos: &Qos) -> RawHandle {
    ret_handle(graph::create_subscriber(
        Handle::from_raw(participant),
        qos.clone(),
        Listener::new(),
    ))
}

/// Create a writer under a publisher for a topic.
pub fn create_writer(publisher: RawHandle, topic: RawHandle, qos: &Qos) -> RawHandle {
    ret_handle(graph::create_writer(
        Handle::from_raw(publisher),
        Handle::from_raw(topic),
        qos.clone(),
        Listener::new(),
    ))
}

/// Create a reader under a subscriber for a topic.
pub fn create_reader(subscriber: RawHandle, topic: RawHandle, qos: &Qos) -> RawHandle {
    ret_handle(graph::create_reader(
        Handle::from_raw(subscriber),
        Handle::from_raw(topic),
        qos.clone(),
        Listener::new(),
    ))
}

/// Enable an entity.
pub fn enable(entity: RawHandle) -> RawHandle {
    ret(graph::enable(Handle::from_raw(entity)))
}

/// Recursively delete an entity.
pub fn delete(entity: RawHandle) -> RawHandle {
    ret(graph::delete(Handle::from_raw(entity)))
}

/// Parent handle (0 for a participant) or a negative retcode.
pub fn get_parent(entity: RawHandle) -> RawHandle {
    match graph::get_parent(Handle::from_raw(entity)) {
        Ok(Some(parent)) => parent.raw(),
        Ok(None) => 0,
        Err(code) => code.as_raw(),
    }
}

/// Owning participant handle or a negative retcode.
pub fn get_participant(entity: RawHandle) -> RawHandle {
    ret_handle(graph::get_participant(Handle::from_raw(entity)))
}

/// Fill `out` with the entity's children; returns the count or a
/// negative retcode.
pub fn get_children(entity: RawHandle, out: &mut Vec<RawHandle>) -> RawHandle {
    match graph::get_children(Handle::from_raw(entity)) {
        Ok(children) => {
            out.clear();
            out.extend(children.iter().map(|h| h.raw()));
            out.len() as RawHandle
        }
        Err(code) => code.as_raw(),
    }
}

/// Domain id of the entity or a negative retcode.
pub fn get_domain_id(entity: RawHandle) -> RawHandle {
    match graph::get_domain_id(Handle::from_raw(entity)) {
        Ok(id) => id as RawHandle,
        Err(code) => code.as_raw(),
    }
}

/// Get the entity's QoS.
pub fn get_qos(entity: RawHandle, out: &mut Qos) -> RawHandle {
    match graph::get_qos(Handle::from_raw(entity)) {
        Ok(qos) => {
            *out = qos;
            0
        }
        Err(code) => code.as_raw(),
    }
}

/// Apply a (possibly partial) QoS update.
pub fn set_qos(entity: RawHandle, qos: &Qos) -> RawHandle {
    ret(graph::set_qos(Handle::from_raw(entity), qos))
}

/// Raised status bits without clearing, or a negative retcode.
pub fn read_status(entity: RawHandle) -> RawHandle {
    match graph::read_status(Handle::from_raw(entity)) {
        Ok(mask) => mask.bits() as RawHandle,
        Err(code) => code.as_raw(),
    }
}

/// Raised status bits, cleared, or a negative retcode.
pub fn take_status(entity: RawHandle) -> RawHandle {
    match graph::take_status(Handle::from_raw(entity)) {
        Ok(mask) => mask.bits() as RawHandle,
        Err(code) => code.as_raw(),
    }
}

/// Replace the entity-level enabled status mask.
pub fn set_status_mask(entity: RawHandle, mask: u32) -> RawHandle {
    ret(graph::set_status_mask(
        Handle::from_raw(entity),
        StatusMask::from_bits(mask),
    ))
}

/// Publish a serialized sample through a writer.
pub fn write(writer: RawHandle, payload: &[u8]) -> RawHandle {
    write_with_timestamp(writer, payload, Time::now())
}

/// Publish a serialized sample with an explicit source timestamp.
pub fn write_with_timestamp(writer: RawHandle, payload: &[u8], timestamp: Time) -> RawHandle {
    let record = match graph::pin(Handle::from_raw(writer)) {
        Ok(record) => record,
        Err(code) => return code.as_raw(),
    };
    let key = {
        let Some(wd) = record.writer_data() else {
            return ReturnCode::BadParameter.as_raw();
        };
        match wd.type_desc.extract_key(payload) {
            Ok(key) => key,
            Err(code) => return code.as_raw(),
        }
    };
    let result = graph::write_message(
        &record,
        IncomingKind::Data,
        Some(Arc::from(payload.to_vec().into_boxed_slice())),
        key,
        timestamp,
    );
    match result {
        Ok(_seq) => 0,
        Err(code) => code.as_raw(),
    }
}

/// Dispose the instance whose key is carried by `payload`.
pub fn dispose(writer: RawHandle, payload: &[u8]) -> RawHandle {
    writer_sentinel(writer, payload, IncomingKind::Dispose)
}

/// Unregister the instance whose key is carried by `payload`.
pub fn unregister_instance(writer: RawHandle, payload: &[u8]) -> RawHandle {
    writer_sentinel(writer, payload, IncomingKind::Unregister)
}

fn writer_sentinel(writer: RawHandle, payload: &[u8], kind: IncomingKind) -> RawHandle {
    let record = match graph::pin(Handle::from_raw(writer)) {
        Ok(record) => record,
        Err(code) => return code.as_raw(),
    };
    let key = {
        let Some(wd) = record.writer_data() else {
            return ReturnCode::BadParameter.as_raw();
        };
        match wd.type_desc.extract_key(payload) {
            Ok(key) => key,
            Err(code) => return code.as_raw(),
        }
    };
    match graph::write_message(&record, kind, None, key, Time::now()) {
        Ok(_seq) => 0,
        Err(code) => code.as_raw(),
    }
}

/// Take up to `max` serialized samples; returns the count or a negative
/// retcode (`-NoData` when empty).
pub fn take(reader: RawHandle, max: usize, out: &mut Vec<RawSample>) -> RawHandle {
    access(reader, max, out, true)
}

/// Read up to `max` serialized samples without removing them.
pub fn read(reader: RawHandle, max: usize, out: &mut Vec<RawSample>) -> RawHandle {
    access(reader, max, out, false)
}

fn access(reader: RawHandle, max: usize, out: &mut Vec<RawSample>, take: bool) -> RawHandle {
    let record = match graph::pin(Handle::from_raw(reader)) {
        Ok(record) => record,
        Err(code) => return code.as_raw(),
    };
    match graph::reader_access(&record, max, StateMask::ANY, None, None, take) {
        Ok(samples) => {
            *out = samples;
            out.len() as RawHandle
        }
        Err(code) => code.as_raw(),
    }
}
