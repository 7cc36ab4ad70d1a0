// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Builtin topics mirror the entity graph.

mod common;

use common::Msg;
use kdds::rhc::InstanceState;
use kdds::{Participant, Qos};

#[test]
fn test_participant_sees_itself() {
    let participant = Participant::new(340).expect("create participant");
    let builtin = participant.builtin_participants_reader().expect("builtin reader");

    let samples = builtin.take(16).expect("take");
    let own_key = participant.guid().expect("guid").to_bytes();
    assert!(samples
        .iter()
        .any(|s| s.data.as_ref().is_some_and(|d| d.key == own_key)));

    participant.delete().expect("delete");
}

#[test]
fn test_peer_participant_announced_and_disposed() {
    let a = Participant::new(341).expect("participant a");
    a.builtin_participants_reader()
        .expect("reader")
        .take(16)
        .expect("drain own announcement");

    let b = Participant::new(341).expect("participant b");
    let b_key = b.guid().expect("guid").to_bytes();

    let samples = a
        .builtin_participants_reader()
        .expect("reader")
        .take(16)
        .expect("b announced");
    assert!(samples
        .iter()
        .any(|s| s.data.as_ref().is_some_and(|d| d.key == b_key)));

    b.delete().expect("delete b");
    let disposals = a
        .builtin_participants_reader()
        .expect("reader")
        .take(16)
        .expect("b disposed");
    assert!(disposals
        .iter()
        .any(|s| !s.info.valid_data && s.info.instance_state == InstanceState::NotAliveDisposed));

    a.delete().expect("delete a");
}

#[test]
fn test_topic_and_endpoints_reflected() {
    let participant = Participant::new(342).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("reflected", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::reliable()).expect("create writer");
    let reader = participant.create_reader(&topic, Qos::default()).expect("create reader");

    let topics = participant
        .builtin_topics_reader()
        .expect("topics reader")
        .take(16)
        .expect("take");
    assert!(topics.iter().any(|s| s
        .data
        .as_ref()
        .is_some_and(|d| d.name == "reflected" && d.type_name == "kdds_tests::Msg")));

    let pubs = participant
        .builtin_publications_reader()
        .expect("publications reader")
        .take(16)
        .expect("take");
    let writer_guid = kdds::graph::get_guid(writer.handle()).expect("guid").to_bytes();
    let publication = pubs
        .iter()
        .find(|s| s.data.as_ref().is_some_and(|d| d.0.key == writer_guid))
        .expect("writer reflected");
    let pub_data = publication.data.as_ref().expect("data");
    assert_eq!(pub_data.0.topic_name, "reflected");
    assert!(pub_data.0.reliable);

    let subs = participant
        .builtin_subscriptions_reader()
        .expect("subscriptions reader")
        .take(16)
        .expect("take");
    let reader_guid = kdds::graph::get_guid(reader.handle()).expect("guid").to_bytes();
    assert!(subs
        .iter()
        .any(|s| s.data.as_ref().is_some_and(|d| d.0.key == reader_guid)));

    participant.delete().expect("delete");
}

#[test]
fn test_late_participant_replays_graph() {
    let a = Participant::new(343).expect("participant a");
    let topic = a
        .create_topic::<Msg>("replayed", Qos::default())
        .expect("create topic");
    let _writer = a.create_writer(&topic, Qos::default()).expect("create writer");

    // A second participant joins after the graph exists and still sees
    // the topic and the publication.
    let b = Participant::new(343).expect("participant b");

    let topics = b
        .builtin_topics_reader()
        .expect("topics reader")
        .take(16)
        .expect("take");
    assert!(topics
        .iter()
        .any(|s| s.data.as_ref().is_some_and(|d| d.name == "replayed")));

    let pubs = b
        .builtin_publications_reader()
        .expect("publications reader")
        .take(16)
        .expect("take");
    assert!(pubs
        .iter()
        .any(|s| s.data.as_ref().is_some_and(|d| d.0.topic_name == "replayed")));

    a.delete().expect("delete a");
    b.delete().expect("delete b");
}

#[test]
fn test_endpoint_delete_disposes_builtin_instance() {
    let participant = Participant::new(344).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("ep_dispose", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::default()).expect("create writer");

    participant
        .builtin_publications_reader()
        .expect("reader")
        .take(16)
        .expect("drain announcement");

    writer.delete().expect("delete writer");

    let disposals = participant
        .builtin_publications_reader()
        .expect("reader")
        .take(16)
        .expect("disposal visible");
    assert!(disposals
        .iter()
        .any(|s| !s.info.valid_data && s.info.instance_state == InstanceState::NotAliveDisposed));

    participant.delete().expect("delete");
}
