// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Reader history cache (rhc).
//!
//! Per-reader, instance-keyed bounded sample store with DDS read/take
//! semantics, instance lifecycle tracking and condition re-evaluation.

mod cache;
mod condition;
mod instance;
mod state;

pub use cache::{
    CacheObserver, IncomingKind, IncomingSample, RawSample, ReaderCache, ReaderCacheConfig,
    StoreReject,
};
pub use condition::{QueryPredicate, ReadConditionCore};
pub use state::{
    InstanceState, InstanceStateMask, SampleInfo, SampleState, SampleStateMask, StateMask,
    ViewState, ViewStateMask,
};
