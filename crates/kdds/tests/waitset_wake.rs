// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Waitset wake-up paths: read conditions, query conditions, status and
//! guard conditions, across threads.

mod common;

use common::Msg;
use kdds::core::{Duration, ReturnCode};
use kdds::dds::Condition;
use kdds::rhc::{InstanceStateMask, SampleStateMask, ViewStateMask};
use kdds::{GuardCondition, Participant, Qos, WaitSet};
use std::sync::Arc;
use std::time::Instant;

#[test]
fn test_read_condition_wakes_waiter() {
    let participant = Participant::new(280).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("ws_wake", Qos::default())
        .expect("create topic");
    let reader = participant.create_reader(&topic, Qos::reliable()).expect("create reader");
    let writer = participant.create_writer(&topic, Qos::reliable()).expect("create writer");

    let condition = reader
        .create_read_condition(
            SampleStateMask::ANY,
            ViewStateMask::ANY,
            InstanceStateMask::ANY,
        )
        .expect("create condition");
    let cond_id = condition.condition_id();

    let ws = Arc::new(WaitSet::new());
    ws.attach_condition(Arc::new(condition)).expect("attach");

    let ws2 = Arc::clone(&ws);
    let waiter = std::thread::spawn(move || {
        let start = Instant::now();
        let triggered = ws2.wait(Duration::from_secs(5)).expect("wait");
        (start.elapsed(), triggered)
    });

    std::thread::sleep(std::time::Duration::from_millis(50));
    writer.write(&Msg::new(1, "wake up")).expect("write");

    let (elapsed, triggered) = waiter.join().expect("join");
    assert!(elapsed < std::time::Duration::from_secs(1), "woke in {:?}", elapsed);
    assert!(triggered.iter().any(|c| c.condition_id() == cond_id));

    participant.delete().expect("delete");
}

#[test]
fn test_read_condition_level_triggered() {
    let participant = Participant::new(281).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("ws_level", Qos::default())
        .expect("create topic");
    let reader = participant.create_reader(&topic, Qos::reliable()).expect("create reader");
    let writer = participant.create_writer(&topic, Qos::reliable()).expect("create writer");

    let condition = reader
        .create_read_condition(
            SampleStateMask::NOT_READ,
            ViewStateMask::ANY,
            InstanceStateMask::ANY,
        )
        .expect("create condition");

    writer.write(&Msg::new(1, "x")).expect("write");
    assert!(condition.trigger_value());

    // Taking the sample drops the trigger.
    reader.take(10).expect("take");
    assert!(!condition.trigger_value());

    // Wait now times out: the condition is level-triggered over cache
    // contents, not edge-latched.
    let ws = WaitSet::new();
    ws.attach_condition(Arc::new(condition)).expect("attach");
    assert_eq!(
        ws.wait(Duration::from_millis(50)).expect_err("no data"),
        ReturnCode::Timeout
    );

    participant.delete().expect("delete");
}

#[test]
fn test_query_condition_filters_content() {
    let participant = Participant::new(282).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("ws_query", Qos::default())
        .expect("create topic");
    let reader = participant
        .create_reader(&topic, Qos::reliable().keep_all())
        .expect("create reader");
    let writer = participant.create_writer(&topic, Qos::reliable()).expect("create writer");

    let query = reader
        .create_query_condition(
            SampleStateMask::ANY,
            ViewStateMask::ANY,
            InstanceStateMask::ANY,
            |m: &Msg| m.id >= 100,
        )
        .expect("create query condition");

    writer.write(&Msg::new(1, "small")).expect("write");
    assert!(!query.trigger_value());

    writer.write(&Msg::new(100, "big")).expect("write");
    assert!(query.trigger_value());

    // Take through the condition: only the matching sample goes.
    let samples = reader
        .take_with_condition(10, query.as_read_condition())
        .expect("take");
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].data.as_ref().expect("data").id, 100);
    assert!(!query.trigger_value());

    // The non-matching sample is still readable.
    assert_eq!(reader.take(10).expect("take rest").len(), 1);

    participant.delete().expect("delete");
}

#[test]
fn test_guard_condition_wakes_waiter() {
    let guard = Arc::new(GuardCondition::new());
    let ws = Arc::new(WaitSet::new());
    ws.attach_condition(guard.clone()).expect("attach");

    let guard2 = Arc::clone(&guard);
    std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(30));
        guard2.set_trigger_value(true);
    });

    let triggered = ws.wait(Duration::from_secs(5)).expect("wait");
    assert_eq!(triggered.len(), 1);
    assert_eq!(triggered[0].condition_id(), guard.condition_id());
}

#[test]
fn test_status_condition_subscription_matched() {
    let participant = Participant::new(283).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("ws_status", Qos::default())
        .expect("create topic");
    let reader = participant.create_reader(&topic, Qos::default()).expect("create reader");

    let ws = Arc::new(WaitSet::new());
    ws.attach(&reader).expect("attach status condition");

    let ws2 = Arc::clone(&ws);
    let waiter = std::thread::spawn(move || ws2.wait(Duration::from_secs(5)));

    std::thread::sleep(std::time::Duration::from_millis(30));
    // Creating a matching writer raises SUBSCRIPTION_MATCHED.
    let _writer = participant.create_writer(&topic, Qos::default()).expect("create writer");

    let triggered = waiter.join().expect("join").expect("wait");
    assert!(!triggered.is_empty());

    participant.delete().expect("delete");
}

#[test]
fn test_wait_timeout_has_no_side_effects() {
    let ws = WaitSet::new();
    let guard = Arc::new(GuardCondition::new());
    ws.attach_condition(guard.clone()).expect("attach");

    let start = Instant::now();
    assert_eq!(
        ws.wait(Duration::from_millis(60)).expect_err("timeout"),
        ReturnCode::Timeout
    );
    assert!(start.elapsed() >= std::time::Duration::from_millis(50));
    // Still attached and waitable after the timeout.
    assert_eq!(ws.conditions().len(), 1);
    guard.set_trigger_value(true);
    assert_eq!(ws.wait(Duration::from_millis(60)).expect("wait").len(), 1);
}

#[test]
fn test_waitset_multiple_conditions() {
    let ws = WaitSet::new();
    let a = Arc::new(GuardCondition::new());
    let b = Arc::new(GuardCondition::new());
    ws.attach_condition(a.clone()).expect("attach a");
    ws.attach_condition(b.clone()).expect("attach b");

    a.set_trigger_value(true);
    b.set_trigger_value(true);
    let triggered = ws.wait(Duration::from_millis(100)).expect("wait");
    // Waitset triggered iff any condition is; both show up in the list.
    assert_eq!(triggered.len(), 2);
}
