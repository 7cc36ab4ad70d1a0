// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Reliability backpressure: blocking writes, retry after take, and
//! acknowledgment waits.

mod common;

use common::Msg;
use kdds::core::{Duration, ReturnCode};
use kdds::qos::{Reliability, ResourceLimits, LENGTH_UNLIMITED};
use kdds::{Participant, Qos};
use std::time::Instant;

fn keep_all_bounded(bound: usize) -> Qos {
    Qos::reliable()
        .keep_all()
        .with_resource_limits(ResourceLimits::new(bound, LENGTH_UNLIMITED, LENGTH_UNLIMITED))
}

#[test]
fn test_reliable_write_times_out_when_reader_full() {
    let participant = Participant::new(320).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("backpressure", Qos::default())
        .expect("create topic");
    let writer_qos = Qos::new()
        .with_reliability(Reliability::reliable_with_blocking(Duration::from_millis(50)))
        .keep_all()
        .with_resource_limits(ResourceLimits::new(1, LENGTH_UNLIMITED, LENGTH_UNLIMITED));
    let writer = participant.create_writer(&topic, writer_qos).expect("create writer");
    let reader = participant
        .create_reader(&topic, keep_all_bounded(1))
        .expect("create reader");

    // First write fills the reader (and stays unacked: the reader
    // rejected nothing yet, but the writer cache is bounded to 1 and the
    // second sample has nowhere to go).
    writer.write(&Msg::new(1, "fills reader")).expect("write 1");
    // Second write: reader cache full -> sample stays pending in the
    // writer cache, which is itself full -> blocks, then times out.
    writer.write(&Msg::new(1, "fills whc")).expect("write 2 pends");
    let start = Instant::now();
    let err = writer.write(&Msg::new(1, "overflow")).expect_err("must time out");
    assert_eq!(err, ReturnCode::Timeout);
    assert!(start.elapsed() >= std::time::Duration::from_millis(40));

    // Draining the reader frees everything: the pending sample arrives,
    // and new writes succeed again.
    assert_eq!(reader.take(10).expect("take").len(), 1);
    writer
        .wait_for_acknowledgments(Duration::from_secs(2))
        .expect("pending sample delivered and acked");
    assert_eq!(reader.take(10).expect("take pending").len(), 1);
    writer.write(&Msg::new(1, "flows again")).expect("write after drain");

    participant.delete().expect("delete");
}

#[test]
fn test_rejected_sample_redelivered_after_take() {
    let participant = Participant::new(321).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("redelivery", Qos::default())
        .expect("create topic");
    let writer = participant
        .create_writer(&topic, Qos::reliable().keep_all())
        .expect("create writer");
    let reader = participant
        .create_reader(&topic, keep_all_bounded(2))
        .expect("create reader");

    for i in 0..5 {
        writer.write(&Msg::new(1, &format!("r{}", i))).expect("write");
    }

    // The reader accepted only the first two; the rest are pending.
    let first = reader.take(10).expect("take");
    assert_eq!(first.len(), 2);

    // Every take frees space and pumps the next pending samples, in order.
    let mut rest: Vec<String> = Vec::new();
    while let Ok(samples) = reader.take(10) {
        rest.extend(
            samples
                .iter()
                .filter_map(|s| s.data.as_ref().map(|m| m.msg.clone())),
        );
    }
    assert_eq!(rest, vec!["r2", "r3", "r4"]);

    // Everything delivered: the writer sees full acknowledgment.
    writer
        .wait_for_acknowledgments(Duration::from_secs(2))
        .expect("all redelivered");

    participant.delete().expect("delete");
}

#[test]
fn test_best_effort_reader_drops_on_overflow() {
    let participant = Participant::new(322).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("be_drop", Qos::default())
        .expect("create topic");
    let writer = participant.create_writer(&topic, Qos::reliable()).expect("create writer");
    let reader = participant
        .create_reader(
            &topic,
            Qos::best_effort()
                .keep_all()
                .with_resource_limits(ResourceLimits::new(2, LENGTH_UNLIMITED, LENGTH_UNLIMITED)),
        )
        .expect("create reader");

    for i in 0..5 {
        writer.write(&Msg::new(1, &format!("d{}", i))).expect("write");
    }

    // Best effort: overflow drops are final; only the first two remain
    // and the writer is not holding anything back.
    let samples = reader.take(10).expect("take");
    assert_eq!(samples.len(), 2);
    assert_eq!(reader.take(10).expect_err("dropped"), ReturnCode::NoData);

    let rejected = reader.sample_rejected_status().expect("status");
    assert_eq!(rejected.total_count, 3);

    participant.delete().expect("delete");
}

#[test]
fn test_wait_for_acknowledgments_timeout_and_success() {
    let participant = Participant::new(323).expect("create participant");
    let topic = participant
        .create_topic::<Msg>("acks", Qos::default())
        .expect("create topic");
    let writer = participant
        .create_writer(&topic, Qos::reliable().keep_all())
        .expect("create writer");
    let reader = participant
        .create_reader(&topic, keep_all_bounded(1))
        .expect("create reader");

    writer.write(&Msg::new(1, "a")).expect("write");
    writer.write(&Msg::new(1, "b")).expect("write");

    // Sample "b" is stuck until the reader takes "a".
    assert_eq!(
        writer
            .wait_for_acknowledgments(Duration::from_millis(50))
            .expect_err("unacked"),
        ReturnCode::Timeout
    );

    reader.take(10).expect("take");
    writer
        .wait_for_acknowledgments(Duration::from_secs(2))
        .expect("acked after drain");

    participant.delete().expect("delete");
}
