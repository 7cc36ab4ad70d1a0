// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! # kdds - in-process DDS publish/subscribe core
//!
//! A pure Rust implementation of the DDS (Data Distribution Service)
//! core for in-process communication: the entity graph, reader and
//! writer history caches, QoS matching, and the condition/waitset/
//! listener notification layer. Writers and readers in the same process
//! are matched and bound automatically; there is no wire protocol.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kdds::{Participant, Qos};
//! # use kdds::core::{ReturnCode, Result, TopicType};
//! # struct SensorData { value: f64 }
//! # impl TopicType for SensorData {
//! #     fn type_name() -> &'static str { "SensorData" }
//! #     fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
//! #         buf.extend_from_slice(&self.value.to_le_bytes()); Ok(())
//! #     }
//! #     fn decode(buf: &[u8]) -> Result<Self> {
//! #         Ok(SensorData { value: f64::from_le_bytes(
//! #             buf.get(0..8).ok_or(ReturnCode::BadParameter)?.try_into().unwrap()) })
//! #     }
//! # }
//!
//! fn main() -> kdds::core::Result<()> {
//!     let participant = Participant::new(0)?;
//!     let topic = participant.create_topic::<SensorData>("sensors", Qos::default())?;
//!
//!     let writer = participant.create_writer(&topic, Qos::reliable())?;
//!     let reader = participant.create_reader(&topic, Qos::reliable())?;
//!
//!     writer.write(&SensorData { value: 42.0 })?;
//!     for sample in reader.take(16)? {
//!         if let Some(data) = sample.data {
//!             println!("got {}", data.value);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                      Application Layer                       |
//! |  Participant -> Publisher/Subscriber -> DataWriter/DataReader |
//! +--------------------------------------------------------------+
//! |                        Entity Graph                          |
//! |  handle table | QoS engine | matching | statuses | listeners |
//! +--------------------------------------------------------------+
//! |                        Sample Caches                         |
//! |  writer history (whc)  ->  in-process bus  ->  reader (rhc)  |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`dds`] - public API (start here)
//! - [`qos`] - Quality of Service policies and matching
//! - [`rhc`] / [`whc`] - reader and writer history caches
//! - [`graph`] - the entity graph and handle-based operations
//! - [`builtin`] - DCPS builtin topics mirroring the graph
//! - [`logging`] - structured log fan-out
//! - [`stats`] - per-entity statistics

/// Builtin topics reflecting the entity graph.
pub mod builtin;
/// Process-wide primitives: handles, ids, time, retcodes, type registry.
pub mod core;
/// Public DDS API (Participant, DataReader, DataWriter, WaitSet).
pub mod dds;
/// Entity graph, matching and handle-based operations.
pub mod graph;
/// Structured log fan-out (categories, sinks).
pub mod logging;
/// QoS policies, the QoS bag and requested/offered matching.
pub mod qos;
/// Reader history cache.
pub mod rhc;
/// Per-entity statistics snapshots.
pub mod stats;
/// Writer history cache.
pub mod whc;

pub use crate::core::{Duration, Guid, Handle, ReturnCode, Time, TopicType};
pub use dds::{
    Condition, DataReader, DataWriter, GuardCondition, HasStatusCondition, Listener, Participant,
    Publisher, QueryCondition, ReadCondition, Sample, StatusCondition, Subscriber, Topic, WaitSet,
};
pub use graph::status::StatusMask;
pub use qos::Qos;
pub use rhc::{InstanceState, SampleInfo, SampleState, StateMask, ViewState};

/// Force initialization of the process-wide context (handle table,
/// generators). Everything also initializes lazily behind once-guards;
/// call this to front-load the cost.
pub fn init() {
    let _ = graph::global();
    let _ = crate::core::iid::iid_generator();
    let _ = crate::core::types::type_registry();
}

/// kdds version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
