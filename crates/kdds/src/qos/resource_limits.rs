// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! RESOURCE_LIMITS policy: cache size bounds.

/// Sentinel for "no limit".
pub const LENGTH_UNLIMITED: usize = usize::MAX;

/// RESOURCE_LIMITS policy bounding the reader and writer caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum samples across all instances.
    pub max_samples: usize,
    /// Maximum number of instances.
    pub max_instances: usize,
    /// Maximum samples retained per instance.
    pub max_samples_per_instance: usize,
}

impl ResourceLimits {
    /// Unlimited in all dimensions (default).
    pub fn unlimited() -> Self {
        Self {
            max_samples: LENGTH_UNLIMITED,
            max_instances: LENGTH_UNLIMITED,
            max_samples_per_instance: LENGTH_UNLIMITED,
        }
    }

    pub fn new(max_samples: usize, max_instances: usize, max_samples_per_instance: usize) -> Self {
        Self {
            max_samples,
            max_instances,
            max_samples_per_instance,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_samples == LENGTH_UNLIMITED
            && self.max_instances == LENGTH_UNLIMITED
            && self.max_samples_per_instance == LENGTH_UNLIMITED
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::unlimited()
    }
}
