// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! LIVELINESS policy: how a writer asserts it is alive.

use crate::core::time::Duration;

/// Liveliness kinds, ordered weakest commitment first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LivelinessKind {
    /// The middleware asserts liveliness automatically.
    #[default]
    Automatic = 0,
    /// The application asserts liveliness once per participant.
    ManualByParticipant = 1,
    /// The application asserts liveliness per writer.
    ManualByTopic = 2,
}

/// LIVELINESS policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Liveliness {
    pub kind: LivelinessKind,
    /// Maximum gap between liveliness assertions.
    pub lease_duration: Duration,
}

impl Liveliness {
    /// AUTOMATIC with an infinite lease (default).
    pub fn automatic() -> Self {
        Self {
            kind: LivelinessKind::Automatic,
            lease_duration: Duration::INFINITE,
        }
    }

    /// AUTOMATIC with a lease in seconds.
    pub fn automatic_secs(secs: i64) -> Self {
        Self {
            kind: LivelinessKind::Automatic,
            lease_duration: Duration::from_secs(secs),
        }
    }

    /// MANUAL_BY_PARTICIPANT with the given lease.
    pub fn manual_by_participant(lease_duration: Duration) -> Self {
        Self {
            kind: LivelinessKind::ManualByParticipant,
            lease_duration,
        }
    }

    /// MANUAL_BY_TOPIC with the given lease.
    pub fn manual_by_topic(lease_duration: Duration) -> Self {
        Self {
            kind: LivelinessKind::ManualByTopic,
            lease_duration,
        }
    }
}

impl Default for Liveliness {
    fn default() -> Self {
        Self::automatic()
    }
}
