// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! QoS compatibility checking (RxO - Requested vs Offered).
//!
//! Decides whether a DataWriter can serve a DataReader. The reader
//! requests, the writer offers; for every ordered policy the request must
//! not exceed the offer. On mismatch the first incompatible policy id is
//! reported so it can land in the requested/offered-incompatible-QoS
//! statuses.
//!
//! | Policy            | Rule                                             |
//! |-------------------|--------------------------------------------------|
//! | Reliability       | reader <= writer (BestEffort < Reliable)         |
//! | Durability        | reader <= writer (Volatile < TransientLocal < Transient < Persistent) |
//! | Presentation      | reader scope <= writer scope (Instance < Topic < Group) |
//! | Deadline          | reader period >= writer period                   |
//! | LatencyBudget     | reader duration >= writer duration               |
//! | Ownership         | kinds equal                                      |
//! | Liveliness        | reader kind <= writer kind, writer lease <= reader lease |
//! | DestinationOrder  | reader <= writer (ByReception < BySource)        |
//! | Partition         | name sets overlap (glob wildcards allowed)       |

use super::profile::{PolicyId, Qos};

/// Check reader/writer compatibility.
///
/// Returns `None` when every policy is compatible, otherwise the first
/// incompatible policy in declaration order.
#[must_use]
pub fn match_qos(reader: &Qos, writer: &Qos) -> Option<PolicyId> {
    if reader.reliability.kind > writer.reliability.kind {
        log::debug!(
            "[MATCH-QOS] reliability mismatch (reader={:?}, writer={:?})",
            reader.reliability.kind,
            writer.reliability.kind
        );
        return Some(PolicyId::Reliability);
    }

    if reader.durability > writer.durability {
        log::debug!(
            "[MATCH-QOS] durability mismatch (reader={:?}, writer={:?})",
            reader.durability,
            writer.durability
        );
        return Some(PolicyId::Durability);
    }

    if reader.presentation.access_scope > writer.presentation.access_scope {
        log::debug!(
            "[MATCH-QOS] presentation mismatch (reader={:?}, writer={:?})",
            reader.presentation.access_scope,
            writer.presentation.access_scope
        );
        return Some(PolicyId::Presentation);
    }

    // The reader must tolerate at least the period the writer commits to.
    if reader.deadline.period < writer.deadline.period {
        log::debug!(
            "[MATCH-QOS] deadline mismatch (reader={:?}, writer={:?})",
            reader.deadline.period,
            writer.deadline.period
        );
        return Some(PolicyId::Deadline);
    }

    if reader.latency_budget.duration < writer.latency_budget.duration {
        log::debug!(
            "[MATCH-QOS] latency budget mismatch (reader={:?}, writer={:?})",
            reader.latency_budget.duration,
            writer.latency_budget.duration
        );
        return Some(PolicyId::LatencyBudget);
    }

    if reader.ownership.kind != writer.ownership.kind {
        log::debug!(
            "[MATCH-QOS] ownership mismatch (reader={:?}, writer={:?})",
            reader.ownership.kind,
            writer.ownership.kind
        );
        return Some(PolicyId::Ownership);
    }

    if reader.liveliness.kind > writer.liveliness.kind
        || writer.liveliness.lease_duration > reader.liveliness.lease_duration
    {
        log::debug!(
            "[MATCH-QOS] liveliness mismatch (reader={:?}, writer={:?})",
            reader.liveliness,
            writer.liveliness
        );
        return Some(PolicyId::Liveliness);
    }

    if reader.destination_order.kind > writer.destination_order.kind {
        log::debug!(
            "[MATCH-QOS] destination order mismatch (reader={:?}, writer={:?})",
            reader.destination_order.kind,
            writer.destination_order.kind
        );
        return Some(PolicyId::DestinationOrder);
    }

    if !reader.partition.overlaps(&writer.partition) {
        log::debug!(
            "[MATCH-QOS] partition mismatch (reader={:?}, writer={:?})",
            reader.partition,
            writer.partition
        );
        return Some(PolicyId::Partition);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::liveliness::Liveliness;
    use crate::qos::ordering::Presentation;
    use crate::qos::ownership::Ownership;
    use crate::qos::partition::Partition;
    use crate::qos::reliability::{Durability, Reliability};
    use crate::qos::timing::{Deadline, LatencyBudget};

    fn q() -> Qos {
        Qos::default()
    }

    #[test]
    fn test_defaults_match() {
        assert_eq!(match_qos(&q(), &q()), None);
    }

    #[test]
    fn test_reliability_rule() {
        let reader = q().with_reliability(Reliability::reliable());
        let writer = q().with_reliability(Reliability::best_effort());
        assert_eq!(match_qos(&reader, &writer), Some(PolicyId::Reliability));
        // Stronger writer is fine.
        assert_eq!(match_qos(&writer, &reader), None);
    }

    #[test]
    fn test_durability_rule() {
        let reader = q().with_durability(Durability::TransientLocal);
        let writer = q().with_durability(Durability::Volatile);
        assert_eq!(match_qos(&reader, &writer), Some(PolicyId::Durability));
        assert_eq!(match_qos(&q(), &q().with_durability(Durability::Persistent)), None);
    }

    #[test]
    fn test_presentation_rule() {
        let reader = q().with_presentation(Presentation::group_coherent());
        assert_eq!(match_qos(&reader, &q()), Some(PolicyId::Presentation));
        let writer = q().with_presentation(Presentation::group_coherent());
        assert_eq!(match_qos(&reader, &writer), None);
    }

    #[test]
    fn test_deadline_rule() {
        let reader = q().with_deadline(Deadline::from_millis(100));
        let writer = q().with_deadline(Deadline::from_millis(200));
        assert_eq!(match_qos(&reader, &writer), Some(PolicyId::Deadline));
        // Faster writer satisfies a slower reader.
        let fast_writer = q().with_deadline(Deadline::from_millis(50));
        assert_eq!(match_qos(&reader, &fast_writer), None);
    }

    #[test]
    fn test_latency_budget_rule() {
        let reader = q().with_latency_budget(LatencyBudget::zero());
        let writer = q().with_latency_budget(LatencyBudget::from_millis(10));
        assert_eq!(match_qos(&reader, &writer), Some(PolicyId::LatencyBudget));
        assert_eq!(match_qos(&writer, &reader), None);
    }

    #[test]
    fn test_ownership_rule() {
        let reader = q().with_ownership(Ownership::exclusive());
        assert_eq!(match_qos(&reader, &q()), Some(PolicyId::Ownership));
        assert_eq!(match_qos(&q(), &q().with_ownership(Ownership::exclusive())), Some(PolicyId::Ownership));
    }

    #[test]
    fn test_liveliness_rule() {
        let reader = q().with_liveliness(Liveliness::automatic_secs(5));
        let writer = q().with_liveliness(Liveliness::automatic_secs(10));
        // Writer lease exceeds what the reader tolerates.
        assert_eq!(match_qos(&reader, &writer), Some(PolicyId::Liveliness));
        assert_eq!(match_qos(&writer, &reader), None);
    }

    #[test]
    fn test_destination_order_rule() {
        let reader = q().with_destination_order(crate::qos::ordering::DestinationOrder::by_source_timestamp());
        assert_eq!(match_qos(&reader, &q()), Some(PolicyId::DestinationOrder));
        let writer = q().with_destination_order(crate::qos::ordering::DestinationOrder::by_source_timestamp());
        assert_eq!(match_qos(&reader, &writer), None);
    }

    #[test]
    fn test_partition_rule() {
        let reader = q().with_partition(Partition::single("telemetry.cpu"));
        let writer = q().with_partition(Partition::single("telemetry.*"));
        assert_eq!(match_qos(&reader, &writer), None);
        let other = q().with_partition(Partition::single("control.*"));
        assert_eq!(match_qos(&reader, &other), Some(PolicyId::Partition));
    }

    #[test]
    fn test_monotonicity_stricter_reader_never_gains_match() {
        // A reader that mismatches stays mismatched when made stricter.
        let writer = q();
        let reader = q().with_durability(Durability::TransientLocal);
        assert!(match_qos(&reader, &writer).is_some());
        let stricter = reader.with_reliability(Reliability::reliable());
        assert!(match_qos(&stricter, &writer).is_some());
    }
}
