// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! End-to-end publish/subscribe within one process.

mod common;

use common::Msg;
use kdds::core::{Duration, ReturnCode};
use kdds::rhc::{InstanceState, SampleState, ViewState};
use kdds::{Participant, Qos, StateMask, StatusMask, WaitSet};
use std::sync::mpsc;

#[test]
fn test_simple_roundtrip() {
    let participant = Participant::new(200).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("roundtrip", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::reliable()).expect("create writer");
    let reader = participant.create_reader(&topic, Qos::reliable()).expect("create reader");

    writer.write(&Msg::new(1, "hi")).expect("write");

    // Wait for DATA_AVAILABLE through a waitset on the status condition.
    let ws = WaitSet::new();
    ws.attach(&reader).expect("attach");
    let triggered = ws.wait(Duration::from_secs(1)).expect("wait");
    assert!(!triggered.is_empty());

    let samples = reader.take(16).expect("take");
    assert_eq!(samples.len(), 1);
    let sample = &samples[0];
    assert_eq!(sample.data.as_ref().expect("valid data"), &Msg::new(1, "hi"));
    assert!(sample.info.valid_data);
    assert_eq!(sample.info.sample_state, SampleState::NotRead);
    assert_eq!(sample.info.view_state, ViewState::New);
    assert_eq!(sample.info.instance_state, InstanceState::Alive);

    // Nothing left.
    assert_eq!(reader.take(16).expect_err("empty"), ReturnCode::NoData);

    participant.delete().expect("delete");
}

#[test]
fn test_keep_last_eviction() {
    let participant = Participant::new(201).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("keeplast", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::reliable()).expect("create writer");
    let reader = participant
        .create_reader(&topic, Qos::reliable().keep_last(2))
        .expect("create reader");

    writer.write(&Msg::new(1, "a")).expect("write");
    writer.write(&Msg::new(1, "b")).expect("write");
    writer.write(&Msg::new(1, "c")).expect("write");

    let samples = reader.take(10).expect("take");
    let payloads: Vec<String> = samples
        .iter()
        .filter_map(|s| s.data.as_ref().map(|m| m.msg.clone()))
        .collect();
    assert_eq!(payloads, vec!["b".to_string(), "c".to_string()]);

    participant.delete().expect("delete");
}

#[test]
fn test_read_does_not_consume() {
    let participant = Participant::new(202).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("readtake", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::default()).expect("create writer");
    let reader = participant.create_reader(&topic, Qos::default()).expect("create reader");

    writer.write(&Msg::new(5, "persist")).expect("write");

    let first = reader.read(10).expect("read");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].info.sample_state, SampleState::NotRead);

    // Read again: the sample is still there, now READ.
    let second = reader.read(10).expect("read again");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].info.sample_state, SampleState::Read);

    // NOT_READ-masked read finds nothing now.
    assert_eq!(
        reader.read_mask(10, StateMask::NOT_READ).expect_err("all read"),
        ReturnCode::NoData
    );

    // take still returns it once.
    assert_eq!(reader.take(10).expect("take").len(), 1);
    assert_eq!(reader.take(10).expect_err("empty"), ReturnCode::NoData);

    participant.delete().expect("delete");
}

#[test]
fn test_per_writer_sequence_ascending() {
    let participant = Participant::new(203).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("ordering", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::reliable()).expect("create writer");
    let reader = participant
        .create_reader(&topic, Qos::reliable().keep_all())
        .expect("create reader");

    for i in 0..20 {
        writer.write(&Msg::new(7, &format!("m{}", i))).expect("write");
    }

    let samples = reader.take(64).expect("take");
    assert_eq!(samples.len(), 20);
    let seqs: Vec<u64> = samples.iter().map(|s| s.info.sequence_number).collect();
    for pair in seqs.windows(2) {
        assert!(pair[0] < pair[1], "sequence numbers must ascend: {:?}", seqs);
    }
    // Payloads arrive in publication order.
    let msgs: Vec<&str> = samples
        .iter()
        .filter_map(|s| s.data.as_ref().map(|m| m.msg.as_str()))
        .collect();
    let expected: Vec<String> = (0..20).map(|i| format!("m{}", i)).collect();
    assert_eq!(msgs, expected.iter().map(String::as_str).collect::<Vec<_>>());

    participant.delete().expect("delete");
}

#[test]
fn test_two_instances_interleaved() {
    let participant = Participant::new(204).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("instances", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::reliable()).expect("create writer");
    let reader = participant
        .create_reader(&topic, Qos::reliable().keep_all())
        .expect("create reader");

    writer.write(&Msg::new(1, "a1")).expect("write");
    writer.write(&Msg::new(2, "b1")).expect("write");
    writer.write(&Msg::new(1, "a2")).expect("write");

    let samples = reader.take(10).expect("take");
    assert_eq!(samples.len(), 3);

    // Per-instance order is preserved.
    let of_1: Vec<&str> = samples
        .iter()
        .filter(|s| s.data.as_ref().is_some_and(|m| m.id == 1))
        .map(|s| s.data.as_ref().expect("data").msg.as_str())
        .collect();
    assert_eq!(of_1, vec!["a1", "a2"]);

    // Distinct instance handles per key.
    let h1 = samples
        .iter()
        .find(|s| s.data.as_ref().is_some_and(|m| m.id == 1))
        .expect("instance 1")
        .info
        .instance_handle;
    let h2 = samples
        .iter()
        .find(|s| s.data.as_ref().is_some_and(|m| m.id == 2))
        .expect("instance 2")
        .info
        .instance_handle;
    assert_ne!(h1, h2);

    participant.delete().expect("delete");
}

#[test]
fn test_data_available_listener_fires() {
    let participant = Participant::new(205).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("listener", Qos::default())
        .expect("create topic");
    let subscriber = participant.create_subscriber(Qos::default()).expect("create subscriber");

    let (tx, rx) = mpsc::channel::<kdds::Handle>();
    let listener = kdds::Listener::new().data_available(move |handle, _event| {
        let _ = tx.send(handle);
    });
    let reader = subscriber
        .create_reader_with_listener(&topic, Qos::default(), listener)
        .expect("create reader");

    let writer = participant.create_writer(&topic, Qos::default()).expect("create writer");
    writer.write(&Msg::new(1, "ping")).expect("write");

    let notified = rx
        .recv_timeout(std::time::Duration::from_secs(2))
        .expect("listener fired");
    assert_eq!(notified, reader.handle());

    // The listener consumed the event: the status bit was not raised.
    let raised = reader.read_status().expect("status");
    assert!(!raised.contains(StatusMask::DATA_AVAILABLE));

    participant.delete().expect("delete");
}

#[test]
fn test_data_available_listener_inherits_to_participant() {
    let participant = Participant::new(206).expect("create participant");
    let (tx, rx) = mpsc::channel::<kdds::Handle>();
    participant
        .set_listener(kdds::Listener::new().data_available(move |handle, _| {
            let _ = tx.send(handle);
        }))
        .expect("set listener");

    let topic = participant
        .create_topic::<Msg>("inherit", Qos::default())
        .expect("create topic");
    let reader = participant.create_reader(&topic, Qos::default()).expect("create reader");
    let writer = participant.create_writer(&topic, Qos::default()).expect("create writer");
    writer.write(&Msg::new(1, "up")).expect("write");

    // The reader has no listener; the participant's inherited callback
    // runs and is handed the reader's handle.
    let notified = rx
        .recv_timeout(std::time::Duration::from_secs(2))
        .expect("inherited listener fired");
    assert_eq!(notified, reader.handle());

    participant.delete().expect("delete");
}

#[test]
fn test_write_from_own_listener_is_illegal() {
    let participant = Participant::new(207).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("recursion", Qos::default())
        .expect("create topic");
    let publisher = participant.create_publisher(Qos::default()).expect("create publisher");

    let (tx, rx) = mpsc::channel::<ReturnCode>();
    // The listener fires on PUBLICATION_MATCHED and tries to write
    // through its own writer, which must be refused.
    let listener = kdds::Listener::new().publication_matched(move |handle, _| {
        let writer = kdds::DataWriter::<Msg>::from_handle(handle);
        if let Err(code) = writer.write(&Msg::new(1, "from callback")) {
            let _ = tx.send(code);
        }
    });
    let _writer = publisher
        .create_writer_with_listener(&topic, Qos::default(), listener)
        .expect("create writer");
    let _reader = participant.create_reader(&topic, Qos::default()).expect("create reader");

    let code = rx
        .recv_timeout(std::time::Duration::from_secs(2))
        .expect("callback ran");
    assert_eq!(code, ReturnCode::IllegalOperation);

    participant.delete().expect("delete");
}
