// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! OWNERSHIP and OWNERSHIP_STRENGTH policies.

/// Ownership kinds. Writers and readers must agree exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OwnershipKind {
    /// Any writer may update any instance.
    #[default]
    Shared = 0,
    /// Only the strongest writer owns an instance.
    Exclusive = 1,
}

/// OWNERSHIP policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Ownership {
    pub kind: OwnershipKind,
}

impl Ownership {
    /// Create SHARED ownership (default).
    pub fn shared() -> Self {
        Self {
            kind: OwnershipKind::Shared,
        }
    }

    /// Create EXCLUSIVE ownership.
    pub fn exclusive() -> Self {
        Self {
            kind: OwnershipKind::Exclusive,
        }
    }
}

/// OWNERSHIP_STRENGTH policy: arbitration value for exclusive ownership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct OwnershipStrength {
    pub value: i32,
}

impl OwnershipStrength {
    pub fn new(value: i32) -> Self {
        Self { value }
    }
}
