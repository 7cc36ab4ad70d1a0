// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Structured log fan-out.
//!
//! Records carry a category bitmask (FATAL through TRACE); sinks are
//! registered process-wide with a category mask and swapped atomically,
//! so emitting never takes a lock. The FATAL category additionally
//! routes through the process failure hook after the sinks have seen the
//! record.
//!
//! Internal developer traces use the `log` crate directly; this module
//! is the application-facing channel.

use crate::core::retcode::fail;
use crate::core::time::Time;
use arc_swap::ArcSwap;
use std::sync::{Arc, OnceLock};

/// Log categories, one bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogMask(u32);

impl LogMask {
    pub const NONE: LogMask = LogMask(0);
    pub const FATAL: LogMask = LogMask(1 << 0);
    pub const ERROR: LogMask = LogMask(1 << 1);
    pub const WARNING: LogMask = LogMask(1 << 2);
    pub const INFO: LogMask = LogMask(1 << 3);
    pub const CONFIG: LogMask = LogMask(1 << 4);
    pub const DISCOVERY: LogMask = LogMask(1 << 5);
    pub const DATA: LogMask = LogMask(1 << 6);
    pub const TRACE: LogMask = LogMask(1 << 7);
    pub const ALL: LogMask = LogMask(0xff);

    /// The conventional default: everything up to warnings.
    pub const DEFAULT: LogMask = LogMask(0b111);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        LogMask(bits)
    }

    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn intersects(&self, other: LogMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Short tag for rendering.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match *self {
            LogMask::FATAL => "fatal",
            LogMask::ERROR => "error",
            LogMask::WARNING => "warning",
            LogMask::INFO => "info",
            LogMask::CONFIG => "config",
            LogMask::DISCOVERY => "discovery",
            LogMask::DATA => "data",
            LogMask::TRACE => "trace",
            _ => "log",
        }
    }
}

impl std::ops::BitOr for LogMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        LogMask(self.0 | rhs.0)
    }
}

/// One log record as seen by sinks.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub category: LogMask,
    pub timestamp: Time,
    pub message: String,
}

/// Receiver of log records.
pub trait LogSink: Send + Sync {
    /// Handle one record. Must not call back into the logging API.
    fn write(&self, record: &LogRecord);

    /// Flush buffered output.
    fn flush(&self) {}
}

/// Sink writing `timestamp [category] message` lines to stderr.
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write(&self, record: &LogRecord) {
        eprintln!(
            "{} [{}] {}",
            record.timestamp.nanos(),
            record.category.tag(),
            record.message
        );
    }
}

struct SinkEntry {
    sink: Arc<dyn LogSink>,
    mask: LogMask,
}

fn sinks() -> &'static ArcSwap<Vec<SinkEntry>> {
    static SINKS: OnceLock<ArcSwap<Vec<SinkEntry>>> = OnceLock::new();
    SINKS.get_or_init(|| ArcSwap::from_pointee(Vec::new()))
}

/// Register a sink for the categories in `mask`.
pub fn register_sink(sink: Arc<dyn LogSink>, mask: LogMask) {
    let current = sinks().load();
    let mut next: Vec<SinkEntry> = current
        .iter()
        .map(|e| SinkEntry {
            sink: Arc::clone(&e.sink),
            mask: e.mask,
        })
        .collect();
    next.push(SinkEntry { sink, mask });
    sinks().store(Arc::new(next));
}

/// Drop all registered sinks.
pub fn clear_sinks() {
    sinks().store(Arc::new(Vec::new()));
}

/// Emit a record to every sink whose mask covers the category. FATAL
/// records additionally invoke the process failure hook.
pub fn emit(category: LogMask, message: std::fmt::Arguments<'_>) {
    let entries = sinks().load();
    let rendered = message.to_string();
    if !entries.is_empty() {
        let record = LogRecord {
            category,
            timestamp: Time::now(),
            message: rendered.clone(),
        };
        for entry in entries.iter() {
            if entry.mask.intersects(category) {
                entry.sink.write(&record);
            }
        }
    }
    if category.intersects(LogMask::FATAL) {
        fail(&rendered, "log_fatal");
    }
}

/// Flush every registered sink.
pub fn flush() {
    for entry in sinks().load().iter() {
        entry.sink.flush();
    }
}

/// Emit an INFO-category record.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogMask::INFO, format_args!($($arg)*));
    };
}

/// Emit a WARNING-category record.
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogMask::WARNING, format_args!($($arg)*));
    };
}

/// Emit an ERROR-category record.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogMask::ERROR, format_args!($($arg)*));
    };
}

/// Emit a DISCOVERY-category record.
#[macro_export]
macro_rules! log_discovery {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogMask::DISCOVERY, format_args!($($arg)*));
    };
}

/// Emit a FATAL-category record and route through the failure hook.
#[macro_export]
macro_rules! log_fatal {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::LogMask::FATAL, format_args!($($arg)*));
    };
}
