// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Partition matching, including glob wildcards, through the entity path.

mod common;

use common::Msg;
use kdds::qos::{Partition, PolicyId, Qos};
use kdds::Participant;

fn matched_count(
    participant: &Participant,
    writer_partition: Partition,
    reader_partition: Partition,
    topic_name: &str,
) -> u32 {
    let topic = participant
        .create_topic::<Msg>(topic_name, Qos::default())
        .expect("create topic");
    let publisher = participant
        .create_publisher(Qos::new().with_partition(writer_partition))
        .expect("create publisher");
    let _writer = publisher.create_writer(&topic, Qos::default()).expect("create writer");
    let subscriber = participant
        .create_subscriber(Qos::new().with_partition(reader_partition))
        .expect("create subscriber");
    let reader = subscriber.create_reader(&topic, Qos::default()).expect("create reader");
    reader
        .subscription_matched_status()
        .expect("status")
        .current_count
}

#[test]
fn test_wildcard_publisher_matches_literal_subscriber() {
    let participant = Participant::new(260).expect("create participant");
    assert_eq!(
        matched_count(
            &participant,
            Partition::single("telemetry.*"),
            Partition::single("telemetry.cpu"),
            "p1",
        ),
        1
    );
    participant.delete().expect("delete");
}

#[test]
fn test_disjoint_partitions_do_not_match() {
    let participant = Participant::new(261).expect("create participant");
    assert_eq!(
        matched_count(
            &participant,
            Partition::single("telemetry.*"),
            Partition::single("control.cpu"),
            "p2",
        ),
        0
    );
    participant.delete().expect("delete");
}

#[test]
fn test_wildcard_on_subscriber_side() {
    let participant = Participant::new(262).expect("create participant");
    assert_eq!(
        matched_count(
            &participant,
            Partition::single("telemetry.cpu"),
            Partition::single("control.*"),
            "p3",
        ),
        0
    );
    assert_eq!(
        matched_count(
            &participant,
            Partition::single("telemetry.cpu"),
            Partition::single("telemetry.?pu"),
            "p4",
        ),
        1
    );
    participant.delete().expect("delete");
}

#[test]
fn test_incompatibility_reported_on_partition_policy() {
    let participant = Participant::new(263).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("partition_policy", Qos::default())
        .expect("create topic");
    let publisher = participant
        .create_publisher(Qos::new().with_partition(Partition::single("telemetry.*")))
        .expect("create publisher");
    let _writer = publisher.create_writer(&topic, Qos::default()).expect("create writer");
    let subscriber = participant
        .create_subscriber(Qos::new().with_partition(Partition::single("control.*")))
        .expect("create subscriber");
    let reader = subscriber.create_reader(&topic, Qos::default()).expect("create reader");

    assert_eq!(
        reader.requested_incompatible_qos_status().expect("status").last_policy_id,
        Some(PolicyId::Partition)
    );
    participant.delete().expect("delete");
}

#[test]
fn test_default_partitions_match_each_other() {
    let participant = Participant::new(264).expect("create participant");
    assert_eq!(
        matched_count(&participant, Partition::default(), Partition::default(), "p5"),
        1
    );
    // A named partition does not see the default one.
    assert_eq!(
        matched_count(
            &participant,
            Partition::single("named"),
            Partition::default(),
            "p6",
        ),
        0
    );
    // But a catch-all wildcard sees the default (empty) name.
    assert_eq!(
        matched_count(&participant, Partition::single("*"), Partition::default(), "p7"),
        1
    );
    participant.delete().expect("delete");
}

#[test]
fn test_multi_name_overlap() {
    let participant = Participant::new(265).expect("create participant");
    assert_eq!(
        matched_count(
            &participant,
            Partition::new(vec!["a".into(), "b".into()]),
            Partition::new(vec!["c".into(), "b".into()]),
            "p8",
        ),
        1
    );
    participant.delete().expect("delete");
}
