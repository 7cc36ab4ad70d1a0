// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Sample ordering policies: DESTINATION_ORDER and PRESENTATION.

/// Destination order kinds, ordered weakest guarantee first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DestinationOrderKind {
    /// Order samples by reception timestamp (default).
    #[default]
    ByReceptionTimestamp = 0,
    /// Order samples by source timestamp; stale arrivals are dropped.
    BySourceTimestamp = 1,
}

/// DESTINATION_ORDER policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DestinationOrder {
    pub kind: DestinationOrderKind,
}

impl DestinationOrder {
    /// Create BY_RECEPTION_TIMESTAMP policy (default).
    pub fn by_reception_timestamp() -> Self {
        Self {
            kind: DestinationOrderKind::ByReceptionTimestamp,
        }
    }

    /// Create BY_SOURCE_TIMESTAMP policy.
    pub fn by_source_timestamp() -> Self {
        Self {
            kind: DestinationOrderKind::BySourceTimestamp,
        }
    }

    pub fn uses_source_timestamp(&self) -> bool {
        self.kind == DestinationOrderKind::BySourceTimestamp
    }
}

/// Presentation access scopes, ordered narrowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PresentationAccessScope {
    /// Instance-level access (default).
    #[default]
    Instance = 0,
    /// Topic-wide ordering.
    Topic = 1,
    /// Subscriber-wide ordering (with coherent access).
    Group = 2,
}

/// PRESENTATION policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Presentation {
    pub access_scope: PresentationAccessScope,
    pub coherent_access: bool,
    pub ordered_access: bool,
}

impl Presentation {
    /// INSTANCE-level presentation (default).
    pub fn instance() -> Self {
        Self::default()
    }

    /// TOPIC-level presentation with ordered access.
    pub fn topic_ordered() -> Self {
        Self {
            access_scope: PresentationAccessScope::Topic,
            coherent_access: false,
            ordered_access: true,
        }
    }

    /// GROUP-level presentation with coherent access.
    pub fn group_coherent() -> Self {
        Self {
            access_scope: PresentationAccessScope::Group,
            coherent_access: true,
            ordered_access: false,
        }
    }
}
