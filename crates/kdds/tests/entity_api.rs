// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Entity graph API: creation, hierarchy navigation, enablement, status
//! masks, QoS round-trips and deletion semantics.

mod common;

use common::Msg;
use kdds::core::ReturnCode;
use kdds::qos::{Deadline, EntityFactory, Reliability};
use kdds::{Participant, Qos, StatusMask};

fn deleted_err(code: ReturnCode) -> bool {
    // A deleted handle answers AlreadyDeleted while pins drain and
    // BadParameter once the slot is reclaimed.
    matches!(code, ReturnCode::AlreadyDeleted | ReturnCode::BadParameter)
}

#[test]
fn test_create_delete_participant() {
    let participant = Participant::new(100).expect("create participant");
    assert!(participant.handle().raw() > 0);
    assert_eq!(participant.domain_id().expect("domain id"), 100);
    participant.delete().expect("delete");
    let err = participant.domain_id().expect_err("deleted");
    assert!(deleted_err(err));
}

#[test]
fn test_hierarchy_navigation() {
    let participant = Participant::new(101).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("nav", Qos::default())
        .expect("create topic");
    let publisher = participant.create_publisher(Qos::default()).expect("create publisher");
    let writer = publisher.create_writer(&topic, Qos::default()).expect("create writer");

    // Writer -> publisher -> participant.
    let parent = kdds::graph::get_parent(writer.handle()).expect("parent").expect("has parent");
    assert_eq!(parent, publisher.handle());
    assert_eq!(
        kdds::graph::get_participant(writer.handle()).expect("participant"),
        participant.handle()
    );

    // The publisher shows up among the participant's children.
    let children = participant.children().expect("children");
    assert!(children.contains(&publisher.handle()));
    assert!(children.contains(&topic.handle()));

    // And the writer among the publisher's children.
    let pub_children = kdds::graph::get_children(publisher.handle()).expect("children");
    assert_eq!(pub_children, vec![writer.handle()]);

    participant.delete().expect("delete");
}

#[test]
fn test_guid_and_instance_handle() {
    let participant = Participant::new(102).expect("create participant");
    let guid = participant.guid().expect("guid");
    assert!(!guid.is_nil());
    let iid = participant.instance_handle().expect("iid");
    assert_ne!(iid, 0);

    let other = Participant::new(102).expect("second participant");
    assert_ne!(other.guid().expect("guid"), guid);
    // Same process: participants share the first prefix bytes.
    assert_eq!(other.guid().expect("guid").prefix[..8], guid.prefix[..8]);

    participant.delete().expect("delete");
    other.delete().expect("delete");
}

#[test]
fn test_delete_cascades_to_children() {
    let participant = Participant::new(103).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("cascade", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::default()).expect("create writer");
    let reader = participant.create_reader(&topic, Qos::default()).expect("create reader");

    participant.delete().expect("delete");

    assert!(deleted_err(writer.qos().expect_err("writer deleted")));
    assert!(deleted_err(reader.qos().expect_err("reader deleted")));
    assert!(deleted_err(topic.qos().expect_err("topic deleted")));
}

#[test]
fn test_double_delete_reports_deleted() {
    let participant = Participant::new(104).expect("create participant");
    participant.delete().expect("delete");
    let err = participant.delete().expect_err("second delete");
    assert!(deleted_err(err));
}

#[test]
fn test_qos_roundtrip() {
    let participant = Participant::new(105).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("qos_rt", Qos::default())
        .expect("create topic");
    let writer = participant
        .create_writer(&topic, Qos::reliable().keep_last(7))
        .expect("create writer");

    let qos = writer.qos().expect("get qos");
    assert_eq!(qos.reliability, Reliability::reliable());
    assert_eq!(qos.history, kdds::qos::History::KeepLast(7));

    // Mutable update round-trips.
    let update = Qos::new().with_deadline(Deadline::from_millis(250));
    writer.set_qos(&update).expect("set qos");
    let after = writer.qos().expect("get qos");
    assert_eq!(after.deadline, Deadline::from_millis(250));
    // Unset policies were preserved.
    assert_eq!(after.history, kdds::qos::History::KeepLast(7));

    participant.delete().expect("delete");
}

#[test]
fn test_immutable_policy_rejected_after_enable() {
    let participant = Participant::new(106).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("immutable", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::default()).expect("create writer");

    let update = Qos::new().with_reliability(Reliability::reliable());
    assert_eq!(writer.set_qos(&update).expect_err("immutable"), ReturnCode::ImmutablePolicy);
    // QoS untouched.
    assert_eq!(writer.qos().expect("get qos").reliability, Reliability::best_effort());

    participant.delete().expect("delete");
}

#[test]
fn test_inconsistent_policy_rejected() {
    let participant = Participant::new(107).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("inconsistent", Qos::default())
        .expect("create topic");
    let bad = Qos::default().keep_last(0);
    let err = participant.create_writer(&topic, bad).expect_err("inconsistent");
    assert_eq!(err, ReturnCode::InconsistentPolicy);
    participant.delete().expect("delete");
}

#[test]
fn test_topic_type_conflict() {
    let participant = Participant::new(108).expect("create participant");
    let _topic = participant
        .create_topic::<Msg>("conflict", Qos::default())
        .expect("create topic");

    struct OtherType;
    impl kdds::core::TopicType for OtherType {
        fn type_name() -> &'static str {
            "kdds_tests::OtherType"
        }
        fn encode(&self, _buf: &mut Vec<u8>) -> kdds::core::Result<()> {
            Ok(())
        }
        fn decode(_buf: &[u8]) -> kdds::core::Result<Self> {
            Ok(OtherType)
        }
    }

    // Same topic name, different type descriptor.
    let err = participant
        .create_topic::<OtherType>("conflict", Qos::default())
        .expect_err("conflicting registration");
    assert_eq!(err, ReturnCode::InconsistentPolicy);
    participant.delete().expect("delete");
}

#[test]
fn test_manual_enable() {
    let participant_qos = Qos::new().with_entity_factory(EntityFactory::manual_enable());
    let participant =
        Participant::with_qos(109, participant_qos, kdds::Listener::new()).expect("create");
    let topic = participant
        .create_topic::<Msg>("manual", Qos::default())
        .expect("create topic");
    topic.enable().expect("enable topic");

    // Children of a manual-enable factory stay disabled.
    let publisher = participant.create_publisher(Qos::default()).expect("create publisher");
    let writer = publisher.create_writer(&topic, Qos::default()).expect("create writer");

    assert_eq!(
        writer.write(&Msg::new(1, "early")).expect_err("disabled writer"),
        ReturnCode::NotEnabled
    );
    // The writer cannot be enabled before its factory.
    assert_eq!(writer.enable().expect_err("factory disabled"), ReturnCode::PreconditionNotMet);

    publisher.enable().expect("enable publisher");
    writer.enable().expect("enable writer");
    writer.write(&Msg::new(1, "ok")).expect("write after enable");

    participant.delete().expect("delete");
}

#[test]
fn test_status_mask_filters_bits() {
    let participant = Participant::new(110).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("statusmask", Qos::default())
        .expect("create topic");
    let reader = participant.create_reader(&topic, Qos::default()).expect("create reader");

    // Disable DATA_AVAILABLE at the entity level.
    kdds::graph::set_status_mask(reader.handle(), StatusMask::SUBSCRIPTION_MATCHED)
        .expect("set mask");

    let writer = participant.create_writer(&topic, Qos::default()).expect("create writer");
    writer.write(&Msg::new(1, "x")).expect("write");

    let raised = kdds::graph::read_status(reader.handle()).expect("read status");
    assert!(!raised.contains(StatusMask::DATA_AVAILABLE));
    assert!(raised.contains(StatusMask::SUBSCRIPTION_MATCHED));

    participant.delete().expect("delete");
}

#[test]
fn test_take_status_clears() {
    let participant = Participant::new(111).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("takestatus", Qos::default())
        .expect("create topic");
    let reader = participant.create_reader(&topic, Qos::default()).expect("create reader");
    let writer = participant.create_writer(&topic, Qos::default()).expect("create writer");
    writer.write(&Msg::new(1, "x")).expect("write");

    let taken = reader.take_status().expect("take status");
    assert!(taken.contains(StatusMask::DATA_AVAILABLE));
    let after = reader.read_status().expect("read status");
    assert!(!after.contains(StatusMask::DATA_AVAILABLE));

    participant.delete().expect("delete");
}

#[test]
fn test_statistics_snapshot_and_reincarnation_guard() {
    let participant = Participant::new(112).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("stats", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::default()).expect("create writer");
    let reader = participant.create_reader(&topic, Qos::default()).expect("create reader");

    writer.write(&Msg::new(1, "a")).expect("write");
    writer.write(&Msg::new(1, "b")).expect("write");

    let mut wstat = kdds::dds::create_statistics(writer.handle()).expect("writer stats");
    assert_eq!(
        wstat.lookup("samples_written").map(|kv| kv.value),
        Some(2)
    );
    kdds::dds::refresh_statistics(&mut wstat).expect("refresh");

    let rstat = kdds::dds::create_statistics(reader.handle()).expect("reader stats");
    assert_eq!(
        rstat.lookup("samples_received").map(|kv| kv.value),
        Some(2)
    );

    participant.delete().expect("delete");
    let mut stale = wstat;
    assert!(kdds::dds::refresh_statistics(&mut stale).is_err());
}

#[test]
fn test_raw_facade_error_convention() {
    use kdds::dds::raw;

    let p = raw::create_participant(113, &Qos::default());
    assert!(p > 0);
    // Positive handles, strictly negative errors.
    assert!(raw::get_parent(p) == 0);
    assert!(raw::enable(p) == 0);
    assert!(raw::delete(p) == 0);
    let err = raw::delete(p);
    assert!(err < 0);
    assert!(deleted_err(ReturnCode::from_raw(err)));
}
