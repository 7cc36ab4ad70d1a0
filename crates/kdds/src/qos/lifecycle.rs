// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Lifecycle policies: WRITER_DATA_LIFECYCLE, READER_DATA_LIFECYCLE and
//! ENTITY_FACTORY.

use crate::core::time::Duration;

/// Writer data lifecycle policy controlling automatic disposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterDataLifecycle {
    /// Whether deleting the writer (or unregistering an instance) also
    /// disposes the instance.
    pub autodispose_unregistered_instances: bool,
}

impl WriterDataLifecycle {
    /// Auto-dispose on unregister (default).
    pub fn auto_dispose() -> Self {
        Self {
            autodispose_unregistered_instances: true,
        }
    }

    /// Unregister without disposing.
    pub fn manual_dispose() -> Self {
        Self {
            autodispose_unregistered_instances: false,
        }
    }
}

impl Default for WriterDataLifecycle {
    fn default() -> Self {
        Self::auto_dispose()
    }
}

/// Reader data lifecycle policy controlling automatic instance purging.
///
/// Each delay arms a timer when the instance enters the corresponding
/// not-alive state; the timer is canceled if the instance leaves the state
/// before expiry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderDataLifecycle {
    /// Delay before purging NOT_ALIVE_NO_WRITERS instances.
    pub autopurge_nowriter_samples_delay: Duration,
    /// Delay before purging NOT_ALIVE_DISPOSED instances.
    pub autopurge_disposed_samples_delay: Duration,
}

impl ReaderDataLifecycle {
    /// Never purge (infinite delays, default).
    pub fn never_purge() -> Self {
        Self {
            autopurge_nowriter_samples_delay: Duration::INFINITE,
            autopurge_disposed_samples_delay: Duration::INFINITE,
        }
    }

    /// Purge not-alive instances immediately.
    pub fn immediate() -> Self {
        Self {
            autopurge_nowriter_samples_delay: Duration::ZERO,
            autopurge_disposed_samples_delay: Duration::ZERO,
        }
    }

    pub fn with_delays(nowriter: Duration, disposed: Duration) -> Self {
        Self {
            autopurge_nowriter_samples_delay: nowriter,
            autopurge_disposed_samples_delay: disposed,
        }
    }
}

impl Default for ReaderDataLifecycle {
    fn default() -> Self {
        Self::never_purge()
    }
}

/// Entity factory policy controlling auto-enable of created children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityFactory {
    /// Whether entities are enabled at creation.
    pub autoenable_created_entities: bool,
}

impl EntityFactory {
    /// Auto-enable (default).
    pub fn auto_enable() -> Self {
        Self {
            autoenable_created_entities: true,
        }
    }

    /// Children stay disabled until `enable()` is called.
    pub fn manual_enable() -> Self {
        Self {
            autoenable_created_entities: false,
        }
    }
}

impl Default for EntityFactory {
    fn default() -> Self {
        Self::auto_enable()
    }
}
