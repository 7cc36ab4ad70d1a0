// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! The aggregated `Qos` bag with fluent builders.
//!
//! A `Qos` always carries a value for every policy plus a present-mask
//! recording which policies the application set explicitly. `set_qos`
//! merges a partial bag over the entity's current one: policies that were
//! never touched keep their current value. Consistency and mutability
//! checks live here; compatibility checks live in [`super::matching`].

use super::lifecycle::{EntityFactory, ReaderDataLifecycle, WriterDataLifecycle};
use super::liveliness::Liveliness;
use super::ordering::{DestinationOrder, Presentation};
use super::ownership::{Ownership, OwnershipStrength};
use super::partition::Partition;
use super::reliability::{Durability, History, Reliability};
use super::resource_limits::{ResourceLimits, LENGTH_UNLIMITED};
use super::timing::{Deadline, LatencyBudget, Lifespan};
use crate::core::retcode::{ReturnCode, Result};

/// Identifies a single QoS policy, used for present-mask bits, mismatch
/// reporting and incompatible-QoS statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PolicyId {
    Reliability = 0,
    Durability = 1,
    History = 2,
    ResourceLimits = 3,
    Deadline = 4,
    LatencyBudget = 5,
    Lifespan = 6,
    Liveliness = 7,
    Ownership = 8,
    OwnershipStrength = 9,
    Partition = 10,
    Presentation = 11,
    DestinationOrder = 12,
    WriterDataLifecycle = 13,
    ReaderDataLifecycle = 14,
    EntityFactory = 15,
}

impl PolicyId {
    /// All policy ids, in mask-bit order.
    pub const ALL: [PolicyId; 16] = [
        PolicyId::Reliability,
        PolicyId::Durability,
        PolicyId::History,
        PolicyId::ResourceLimits,
        PolicyId::Deadline,
        PolicyId::LatencyBudget,
        PolicyId::Lifespan,
        PolicyId::Liveliness,
        PolicyId::Ownership,
        PolicyId::OwnershipStrength,
        PolicyId::Partition,
        PolicyId::Presentation,
        PolicyId::DestinationOrder,
        PolicyId::WriterDataLifecycle,
        PolicyId::ReaderDataLifecycle,
        PolicyId::EntityFactory,
    ];

    const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Whether the policy may change after the entity is enabled.
    #[must_use]
    pub const fn mutable_after_enable(self) -> bool {
        match self {
            PolicyId::Reliability
            | PolicyId::Durability
            | PolicyId::History
            | PolicyId::ResourceLimits
            | PolicyId::Liveliness
            | PolicyId::Ownership
            | PolicyId::Presentation
            | PolicyId::DestinationOrder => false,
            PolicyId::Deadline
            | PolicyId::LatencyBudget
            | PolicyId::Lifespan
            | PolicyId::OwnershipStrength
            | PolicyId::Partition
            | PolicyId::WriterDataLifecycle
            | PolicyId::ReaderDataLifecycle
            | PolicyId::EntityFactory => true,
        }
    }
}

/// Complete QoS bundle with an explicit-set mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Qos {
    pub reliability: Reliability,
    pub durability: Durability,
    pub history: History,
    pub resource_limits: ResourceLimits,
    pub deadline: Deadline,
    pub latency_budget: LatencyBudget,
    pub lifespan: Lifespan,
    pub liveliness: Liveliness,
    pub ownership: Ownership,
    pub ownership_strength: OwnershipStrength,
    pub partition: Partition,
    pub presentation: Presentation,
    pub destination_order: DestinationOrder,
    pub writer_data_lifecycle: WriterDataLifecycle,
    pub reader_data_lifecycle: ReaderDataLifecycle,
    pub entity_factory: EntityFactory,
    present: u32,
}

impl Default for Qos {
    fn default() -> Self {
        Qos {
            reliability: Reliability::default(),
            durability: Durability::default(),
            history: History::default(),
            resource_limits: ResourceLimits::default(),
            deadline: Deadline::default(),
            latency_budget: LatencyBudget::default(),
            lifespan: Lifespan::default(),
            liveliness: Liveliness::default(),
            ownership: Ownership::default(),
            ownership_strength: OwnershipStrength::default(),
            partition: Partition::default(),
            presentation: Presentation::default(),
            destination_order: DestinationOrder::default(),
            writer_data_lifecycle: WriterDataLifecycle::default(),
            reader_data_lifecycle: ReaderDataLifecycle::default(),
            entity_factory: EntityFactory::default(),
            present: 0,
        }
    }
}

macro_rules! qos_setter {
    ($setter:ident, $field:ident, $ty:ty, $id:expr) => {
        /// Set the policy and mark it present.
        #[must_use]
        pub fn $setter(mut self, value: $ty) -> Self {
            self.$field = value;
            self.present |= $id.bit();
            self
        }
    };
}

impl Qos {
    /// Empty bag: every policy at its default, nothing marked present.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Best-effort baseline profile.
    #[must_use]
    pub fn best_effort() -> Self {
        Self::new().with_reliability(Reliability::best_effort())
    }

    /// Reliable baseline profile.
    #[must_use]
    pub fn reliable() -> Self {
        Self::new().with_reliability(Reliability::reliable())
    }

    qos_setter!(with_reliability, reliability, Reliability, PolicyId::Reliability);
    qos_setter!(with_durability, durability, Durability, PolicyId::Durability);
    qos_setter!(with_history, history, History, PolicyId::History);
    qos_setter!(with_resource_limits, resource_limits, ResourceLimits, PolicyId::ResourceLimits);
    qos_setter!(with_deadline, deadline, Deadline, PolicyId::Deadline);
    qos_setter!(with_latency_budget, latency_budget, LatencyBudget, PolicyId::LatencyBudget);
    qos_setter!(with_lifespan, lifespan, Lifespan, PolicyId::Lifespan);
    qos_setter!(with_liveliness, liveliness, Liveliness, PolicyId::Liveliness);
    qos_setter!(with_ownership, ownership, Ownership, PolicyId::Ownership);
    qos_setter!(with_ownership_strength, ownership_strength, OwnershipStrength, PolicyId::OwnershipStrength);
    qos_setter!(with_partition, partition, Partition, PolicyId::Partition);
    qos_setter!(with_presentation, presentation, Presentation, PolicyId::Presentation);
    qos_setter!(with_destination_order, destination_order, DestinationOrder, PolicyId::DestinationOrder);
    qos_setter!(with_writer_data_lifecycle, writer_data_lifecycle, WriterDataLifecycle, PolicyId::WriterDataLifecycle);
    qos_setter!(with_reader_data_lifecycle, reader_data_lifecycle, ReaderDataLifecycle, PolicyId::ReaderDataLifecycle);
    qos_setter!(with_entity_factory, entity_factory, EntityFactory, PolicyId::EntityFactory);

    /// Shorthand: KEEP_LAST history with the given depth.
    #[must_use]
    pub fn keep_last(self, depth: usize) -> Self {
        self.with_history(History::KeepLast(depth))
    }

    /// Shorthand: KEEP_ALL history.
    #[must_use]
    pub fn keep_all(self) -> Self {
        self.with_history(History::KeepAll)
    }

    /// Shorthand: TRANSIENT_LOCAL durability.
    #[must_use]
    pub fn transient_local(self) -> Self {
        self.with_durability(Durability::TransientLocal)
    }

    /// Whether the application set this policy explicitly.
    #[must_use]
    pub fn is_set(&self, id: PolicyId) -> bool {
        self.present & id.bit() != 0
    }

    /// Merge this (possibly partial) bag over `current`: policies not
    /// explicitly set here take their value from `current`. The result has
    /// every policy marked present.
    #[must_use]
    pub fn merged_over(&self, current: &Qos) -> Qos {
        let mut out = current.clone();
        for id in PolicyId::ALL {
            if self.is_set(id) {
                out.copy_policy(self, id);
            }
        }
        out.present = u32::MAX;
        out
    }

    fn copy_policy(&mut self, from: &Qos, id: PolicyId) {
        match id {
            PolicyId::Reliability => self.reliability = from.reliability,
            PolicyId::Durability => self.durability = from.durability,
            PolicyId::History => self.history = from.history,
            PolicyId::ResourceLimits => self.resource_limits = from.resource_limits,
            PolicyId::Deadline => self.deadline = from.deadline,
            PolicyId::LatencyBudget => self.latency_budget = from.latency_budget,
            PolicyId::Lifespan => self.lifespan = from.lifespan,
            PolicyId::Liveliness => self.liveliness = from.liveliness,
            PolicyId::Ownership => self.ownership = from.ownership,
            PolicyId::OwnershipStrength => self.ownership_strength = from.ownership_strength,
            PolicyId::Partition => self.partition = from.partition.clone(),
            PolicyId::Presentation => self.presentation = from.presentation,
            PolicyId::DestinationOrder => self.destination_order = from.destination_order,
            PolicyId::WriterDataLifecycle => {
                self.writer_data_lifecycle = from.writer_data_lifecycle;
            }
            PolicyId::ReaderDataLifecycle => {
                self.reader_data_lifecycle = from.reader_data_lifecycle;
            }
            PolicyId::EntityFactory => self.entity_factory = from.entity_factory,
        }
    }

    fn policy_equals(&self, other: &Qos, id: PolicyId) -> bool {
        match id {
            PolicyId::Reliability => self.reliability == other.reliability,
            PolicyId::Durability => self.durability == other.durability,
            PolicyId::History => self.history == other.history,
            PolicyId::ResourceLimits => self.resource_limits == other.resource_limits,
            PolicyId::Deadline => self.deadline == other.deadline,
            PolicyId::LatencyBudget => self.latency_budget == other.latency_budget,
            PolicyId::Lifespan => self.lifespan == other.lifespan,
            PolicyId::Liveliness => self.liveliness == other.liveliness,
            PolicyId::Ownership => self.ownership == other.ownership,
            PolicyId::OwnershipStrength => self.ownership_strength == other.ownership_strength,
            PolicyId::Partition => self.partition == other.partition,
            PolicyId::Presentation => self.presentation == other.presentation,
            PolicyId::DestinationOrder => self.destination_order == other.destination_order,
            PolicyId::WriterDataLifecycle => {
                self.writer_data_lifecycle == other.writer_data_lifecycle
            }
            PolicyId::ReaderDataLifecycle => {
                self.reader_data_lifecycle == other.reader_data_lifecycle
            }
            PolicyId::EntityFactory => self.entity_factory == other.entity_factory,
        }
    }

    /// Policies whose value differs from `other`.
    #[must_use]
    pub fn changed_policies(&self, other: &Qos) -> Vec<PolicyId> {
        PolicyId::ALL
            .into_iter()
            .filter(|id| !self.policy_equals(other, *id))
            .collect()
    }

    /// Internal consistency check, applied after merging.
    ///
    /// - KEEP_LAST requires `depth >= 1`.
    /// - A finite `max_samples_per_instance` must admit the KEEP_LAST depth.
    /// - `max_samples` must admit `max_samples_per_instance` when both are
    ///   finite.
    /// - A negative blocking time or deadline period is invalid.
    pub fn check_consistency(&self) -> Result<()> {
        if let History::KeepLast(depth) = self.history {
            if depth == 0 {
                return Err(ReturnCode::InconsistentPolicy);
            }
            let msi = self.resource_limits.max_samples_per_instance;
            if msi != LENGTH_UNLIMITED && depth > msi {
                return Err(ReturnCode::InconsistentPolicy);
            }
        }
        let limits = &self.resource_limits;
        if limits.max_samples != LENGTH_UNLIMITED
            && limits.max_samples_per_instance != LENGTH_UNLIMITED
            && limits.max_samples < limits.max_samples_per_instance
        {
            return Err(ReturnCode::InconsistentPolicy);
        }
        if self.reliability.max_blocking_time.nanos() < 0
            || self.deadline.period.nanos() < 0
            || self.latency_budget.duration.nanos() < 0
            || self.lifespan.duration.nanos() <= 0
            || self.liveliness.lease_duration.nanos() <= 0
        {
            return Err(ReturnCode::InconsistentPolicy);
        }
        Ok(())
    }

    /// Validate an update against an enabled entity's current QoS: every
    /// changed policy must be mutable.
    pub fn check_mutability(&self, current: &Qos) -> Result<()> {
        for id in self.changed_policies(current) {
            if !id.mutable_after_enable() {
                return Err(ReturnCode::ImmutablePolicy);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::Duration;

    #[test]
    fn test_present_mask_tracks_setters() {
        let qos = Qos::new().keep_last(4).with_durability(Durability::TransientLocal);
        assert!(qos.is_set(PolicyId::History));
        assert!(qos.is_set(PolicyId::Durability));
        assert!(!qos.is_set(PolicyId::Reliability));
    }

    #[test]
    fn test_merge_preserves_unset() {
        let current = Qos::new()
            .with_reliability(Reliability::reliable())
            .keep_last(8);
        let update = Qos::new().with_deadline(Deadline::from_millis(50));
        let merged = update.merged_over(&current);
        assert_eq!(merged.reliability, Reliability::reliable());
        assert_eq!(merged.history, History::KeepLast(8));
        assert_eq!(merged.deadline, Deadline::from_millis(50));
    }

    #[test]
    fn test_consistency_keep_last_zero() {
        let qos = Qos::new().keep_last(0).merged_over(&Qos::default());
        assert_eq!(qos.check_consistency().err(), Some(ReturnCode::InconsistentPolicy));
    }

    #[test]
    fn test_consistency_depth_vs_per_instance() {
        let qos = Qos::new()
            .keep_last(10)
            .with_resource_limits(ResourceLimits::new(LENGTH_UNLIMITED, LENGTH_UNLIMITED, 5))
            .merged_over(&Qos::default());
        assert_eq!(qos.check_consistency().err(), Some(ReturnCode::InconsistentPolicy));

        let ok = Qos::new()
            .keep_last(5)
            .with_resource_limits(ResourceLimits::new(LENGTH_UNLIMITED, LENGTH_UNLIMITED, 5))
            .merged_over(&Qos::default());
        assert!(ok.check_consistency().is_ok());
    }

    #[test]
    fn test_consistency_max_samples_vs_per_instance() {
        let qos = Qos::new()
            .with_resource_limits(ResourceLimits::new(4, LENGTH_UNLIMITED, 8))
            .merged_over(&Qos::default());
        assert_eq!(qos.check_consistency().err(), Some(ReturnCode::InconsistentPolicy));
    }

    #[test]
    fn test_consistency_negative_blocking_time() {
        let qos = Qos::new()
            .with_reliability(Reliability::reliable_with_blocking(Duration(-1)))
            .merged_over(&Qos::default());
        assert_eq!(qos.check_consistency().err(), Some(ReturnCode::InconsistentPolicy));
    }

    #[test]
    fn test_mutability() {
        let current = Qos::default();
        let deadline_change = Qos::new()
            .with_deadline(Deadline::from_millis(10))
            .merged_over(&current);
        assert!(deadline_change.check_mutability(&current).is_ok());

        let reliability_change = Qos::new()
            .with_reliability(Reliability::reliable())
            .merged_over(&current);
        assert_eq!(
            reliability_change.check_mutability(&current).err(),
            Some(ReturnCode::ImmutablePolicy)
        );
    }

    #[test]
    fn test_qos_roundtrip_equality() {
        let qos = Qos::reliable().keep_last(3).transient_local();
        let merged = qos.merged_over(&Qos::default());
        // Round-trip: merging the merged bag over defaults changes nothing.
        assert_eq!(merged.changed_policies(&merged.merged_over(&Qos::default())).len(), 0);
    }
}
