// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Process-wide primitives: handles, identifiers, time, return codes and
//! the type registry. Everything here is graph-agnostic; the entity layer
//! builds on top.

pub mod guid;
pub mod handles;
pub mod iid;
pub mod retcode;
pub mod signal;
pub mod time;
pub mod types;

pub use guid::{Guid, GuidKind};
pub use handles::{Handle, HandleTable, Pinned};
pub use iid::iid_generator;
pub use retcode::{fail, set_fail_handler, ReturnCode, Result};
pub use signal::{SignalSet, WaitsetSignal};
pub use time::{Duration, MonotonicTime, Time};
pub use types::{hash_key, type_registry, TopicType, TypeDescriptor, TypeId};
