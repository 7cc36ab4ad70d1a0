// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Public DDS API.
//!
//! Entry point is [`Participant`]; from it hang topics, publishers,
//! subscribers, writers and readers. All wrappers are `Copy` handles
//! onto the entity graph - cloning never duplicates an entity, and
//! entities live until explicitly deleted (deleting a parent deletes its
//! children).
//!
//! ```no_run
//! use kdds::{Participant, Qos};
//! use kdds::core::{ReturnCode, Result, TopicType};
//!
//! struct Reading { id: u32, value: f64 }
//!
//! impl TopicType for Reading {
//!     fn type_name() -> &'static str { "Reading" }
//!     fn has_key() -> bool { true }
//!     fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
//!         buf.extend_from_slice(&self.id.to_le_bytes());
//!         buf.extend_from_slice(&self.value.to_le_bytes());
//!         Ok(())
//!     }
//!     fn decode(buf: &[u8]) -> Result<Self> {
//!         if buf.len() < 12 { return Err(ReturnCode::BadParameter); }
//!         Ok(Reading {
//!             id: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
//!             value: f64::from_le_bytes(buf[4..12].try_into().unwrap()),
//!         })
//!     }
//!     fn key_bytes(&self) -> Vec<u8> { self.id.to_le_bytes().to_vec() }
//! }
//!
//! fn main() -> Result<()> {
//!     let participant = Participant::new(0)?;
//!     let topic = participant.create_topic::<Reading>("readings", Qos::default())?;
//!     let writer = participant.create_writer(&topic, Qos::reliable())?;
//!     writer.write(&Reading { id: 1, value: 21.5 })?;
//!     Ok(())
//! }
//! ```

pub mod condition;
/// Listener tables and dispatch.
pub mod listener;
mod participant;
mod publisher;
/// Raw signed-integer handle facade.
pub mod raw;
mod read_condition;
mod reader;
mod subscriber;
mod topic;
mod waitset;
mod writer;

pub use condition::{Condition, GuardCondition, HasStatusCondition, StatusCondition};
pub use listener::{Listener, StatusEvent};
pub use participant::Participant;
pub use publisher::Publisher;
pub use read_condition::{QueryCondition, ReadCondition};
pub use reader::{DataReader, Sample};
pub use subscriber::Subscriber;
pub use topic::Topic;
pub use waitset::WaitSet;
pub use writer::DataWriter;

pub use crate::graph::{create_statistics, refresh_statistics};
