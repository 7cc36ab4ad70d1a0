// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Return codes and the process-level failure hook.
//!
//! Every public operation reports errors through [`ReturnCode`]. The raw
//! integer convention follows the classic DDS C binding: a non-negative
//! value is success (or an entity handle), a negative value is `-retcode`.
//! [`ReturnCode::as_raw`] / [`ReturnCode::from_raw`] convert between the
//! two worlds for the raw handle facade.
//!
//! Fatal conditions (allocation failure after partial state change, broken
//! internal invariants) are routed through a process-wide failure hook that
//! defaults to `abort()`. Applications may install a replacement with
//! [`set_fail_handler`].

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Operation result codes.
///
/// `Ok` is never returned through `Err`; it exists so the raw facade can
/// round-trip zero. All other variants map to strictly negative raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReturnCode {
    /// Success.
    Ok = 0,
    /// Non-specific error.
    Error = 1,
    /// Operation is not supported.
    Unsupported = 2,
    /// An argument was invalid (null handle, negative count, bad mask).
    BadParameter = 3,
    /// A precondition for the operation was not met.
    PreconditionNotMet = 4,
    /// A resource limit prevented the operation.
    OutOfResources = 5,
    /// The entity has not been enabled yet.
    NotEnabled = 6,
    /// Attempt to change a policy that is immutable after enable.
    ImmutablePolicy = 7,
    /// The requested QoS (or type registration) is internally inconsistent.
    InconsistentPolicy = 8,
    /// The entity has already been deleted.
    AlreadyDeleted = 9,
    /// A blocking operation reached its deadline.
    Timeout = 10,
    /// No data available to read or take.
    NoData = 11,
    /// The operation is not allowed in the calling context
    /// (e.g. re-entrant call from a listener on the same entity).
    IllegalOperation = 12,
    /// Denied by access control.
    NotAllowedBySecurity = 13,
}

impl ReturnCode {
    /// Raw signed-integer encoding: `Ok` is 0, errors are negative.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        -(self as i32)
    }

    /// Decode a raw value. Non-negative values decode to `Ok`.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        match -raw {
            i if i <= 0 => ReturnCode::Ok,
            1 => ReturnCode::Error,
            2 => ReturnCode::Unsupported,
            3 => ReturnCode::BadParameter,
            4 => ReturnCode::PreconditionNotMet,
            5 => ReturnCode::OutOfResources,
            6 => ReturnCode::NotEnabled,
            7 => ReturnCode::ImmutablePolicy,
            8 => ReturnCode::InconsistentPolicy,
            9 => ReturnCode::AlreadyDeleted,
            10 => ReturnCode::Timeout,
            11 => ReturnCode::NoData,
            12 => ReturnCode::IllegalOperation,
            13 => ReturnCode::NotAllowedBySecurity,
            _ => ReturnCode::Error,
        }
    }

    /// Human-readable name, matching the classic `dds_strretcode` strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ReturnCode::Ok => "Success",
            ReturnCode::Error => "Error",
            ReturnCode::Unsupported => "Unsupported",
            ReturnCode::BadParameter => "Bad Parameter",
            ReturnCode::PreconditionNotMet => "Precondition Not Met",
            ReturnCode::OutOfResources => "Out Of Resources",
            ReturnCode::NotEnabled => "Not Enabled",
            ReturnCode::ImmutablePolicy => "Immutable Policy",
            ReturnCode::InconsistentPolicy => "Inconsistent Policy",
            ReturnCode::AlreadyDeleted => "Already Deleted",
            ReturnCode::Timeout => "Timeout",
            ReturnCode::NoData => "No Data",
            ReturnCode::IllegalOperation => "Illegal Operation",
            ReturnCode::NotAllowedBySecurity => "Not Allowed By Security",
        }
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for ReturnCode {}

/// Convenient alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReturnCode>;

/// Process failure handler: called with (message, location).
pub type FailHandler = dyn Fn(&str, &str) + Send + Sync;

fn default_fail(msg: &str, where_: &str) {
    eprintln!("Aborting Failure: {} {}", where_, msg);
    std::process::abort();
}

fn fail_hook() -> &'static ArcSwap<Box<FailHandler>> {
    use std::sync::OnceLock;
    static HOOK: OnceLock<ArcSwap<Box<FailHandler>>> = OnceLock::new();
    HOOK.get_or_init(|| ArcSwap::from_pointee(Box::new(default_fail) as Box<FailHandler>))
}

/// Install a replacement failure handler. The default aborts the process.
pub fn set_fail_handler<F>(handler: F)
where
    F: Fn(&str, &str) + Send + Sync + 'static,
{
    fail_hook().store(Arc::new(Box::new(handler)));
}

/// Report an unrecoverable failure through the installed handler.
///
/// Does not return when the default handler is installed.
pub fn fail(msg: &str, where_: &str) {
    (fail_hook().load())(msg, where_);
}
