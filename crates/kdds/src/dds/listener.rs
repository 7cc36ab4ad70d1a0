// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Listener tables and the per-participant dispatch thread.
//!
//! Callbacks never run on the thread that caused the status change; every
//! participant owns one dispatcher thread that drains a queue in order,
//! which serializes callbacks per entity. While a callback runs, a
//! thread-local records the entity being notified so blocking re-entrant
//! calls on that same entity can be refused with `IllegalOperation`.
//!
//! The dispatcher doubles as the participant's housekeeping tick, driving
//! reader auto-purge deadlines.

use crate::core::handles::Handle;
use crate::graph::status::{
    IncompatibleQosStatus, PublicationMatchedStatus, SampleLostStatus, SampleRejectedStatus,
    StatusMask, SubscriptionMatchedStatus,
};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::cell::Cell;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

/// Event payload delivered to listener callbacks.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    DataAvailable,
    DataOnReaders,
    SampleLost(SampleLostStatus),
    SampleRejected(SampleRejectedStatus),
    SubscriptionMatched(SubscriptionMatchedStatus),
    PublicationMatched(PublicationMatchedStatus),
    RequestedIncompatibleQos(IncompatibleQosStatus),
    OfferedIncompatibleQos(IncompatibleQosStatus),
}

impl StatusEvent {
    /// The status bit this event corresponds to.
    #[must_use]
    pub fn status(&self) -> StatusMask {
        match self {
            StatusEvent::DataAvailable => StatusMask::DATA_AVAILABLE,
            StatusEvent::DataOnReaders => StatusMask::DATA_ON_READERS,
            StatusEvent::SampleLost(_) => StatusMask::SAMPLE_LOST,
            StatusEvent::SampleRejected(_) => StatusMask::SAMPLE_REJECTED,
            StatusEvent::SubscriptionMatched(_) => StatusMask::SUBSCRIPTION_MATCHED,
            StatusEvent::PublicationMatched(_) => StatusMask::PUBLICATION_MATCHED,
            StatusEvent::RequestedIncompatibleQos(_) => StatusMask::REQUESTED_INCOMPATIBLE_QOS,
            StatusEvent::OfferedIncompatibleQos(_) => StatusMask::OFFERED_INCOMPATIBLE_QOS,
        }
    }
}

/// Listener callback signature: entity handle plus the event.
pub type Callback = Arc<dyn Fn(Handle, &StatusEvent) + Send + Sync>;

/// Per-entity callback table. Unset entries fall through to the status
/// bit; the DATA_AVAILABLE family additionally inherits from ancestors.
#[derive(Default, Clone)]
pub struct Listener {
    pub on_data_available: Option<Callback>,
    pub on_data_on_readers: Option<Callback>,
    pub on_sample_lost: Option<Callback>,
    pub on_sample_rejected: Option<Callback>,
    pub on_subscription_matched: Option<Callback>,
    pub on_publication_matched: Option<Callback>,
    pub on_requested_incompatible_qos: Option<Callback>,
    pub on_offered_incompatible_qos: Option<Callback>,
}

macro_rules! listener_setter {
    ($setter:ident, $field:ident) => {
        #[must_use]
        pub fn $setter<F>(mut self, f: F) -> Self
        where
            F: Fn(Handle, &StatusEvent) + Send + Sync + 'static,
        {
            self.$field = Some(Arc::new(f));
            self
        }
    };
}

impl Listener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    listener_setter!(data_available, on_data_available);
    listener_setter!(data_on_readers, on_data_on_readers);
    listener_setter!(sample_lost, on_sample_lost);
    listener_setter!(sample_rejected, on_sample_rejected);
    listener_setter!(subscription_matched, on_subscription_matched);
    listener_setter!(publication_matched, on_publication_matched);
    listener_setter!(requested_incompatible_qos, on_requested_incompatible_qos);
    listener_setter!(offered_incompatible_qos, on_offered_incompatible_qos);

    /// Callback for a status bit, if set.
    #[must_use]
    pub fn get(&self, status: StatusMask) -> Option<Callback> {
        let slot = match status {
            s if s == StatusMask::DATA_AVAILABLE => &self.on_data_available,
            s if s == StatusMask::DATA_ON_READERS => &self.on_data_on_readers,
            s if s == StatusMask::SAMPLE_LOST => &self.on_sample_lost,
            s if s == StatusMask::SAMPLE_REJECTED => &self.on_sample_rejected,
            s if s == StatusMask::SUBSCRIPTION_MATCHED => &self.on_subscription_matched,
            s if s == StatusMask::PUBLICATION_MATCHED => &self.on_publication_matched,
            s if s == StatusMask::REQUESTED_INCOMPATIBLE_QOS => {
                &self.on_requested_incompatible_qos
            }
            s if s == StatusMask::OFFERED_INCOMPATIBLE_QOS => &self.on_offered_incompatible_qos,
            _ => &None,
        };
        slot.clone()
    }
}

thread_local! {
    static IN_CALLBACK: Cell<Option<Handle>> = const { Cell::new(None) };
}

/// Entity currently being notified on this thread, if any.
#[must_use]
pub fn current_callback_entity() -> Option<Handle> {
    IN_CALLBACK.with(Cell::get)
}

enum DispatchItem {
    Invoke {
        callback: Callback,
        entity: Handle,
        event: StatusEvent,
    },
    Shutdown,
}

/// Handle to a participant's dispatch thread.
pub struct Dispatcher {
    tx: Sender<DispatchItem>,
    thread: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

const HOUSEKEEPING_TICK: StdDuration = StdDuration::from_millis(50);

impl Dispatcher {
    /// Spawn the dispatch thread. `housekeep` runs on every idle tick
    /// (auto-purge timers and similar deferred work).
    pub fn spawn<F>(name: &str, housekeep: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx): (Sender<DispatchItem>, Receiver<DispatchItem>) = unbounded();
        let thread = std::thread::Builder::new()
            .name(format!("kdds-dispatch-{}", name))
            .spawn(move || loop {
                match rx.recv_timeout(HOUSEKEEPING_TICK) {
                    Ok(DispatchItem::Invoke {
                        callback,
                        entity,
                        event,
                    }) => {
                        IN_CALLBACK.with(|cell| cell.set(Some(entity)));
                        callback(entity, &event);
                        IN_CALLBACK.with(|cell| cell.set(None));
                    }
                    Ok(DispatchItem::Shutdown) => break,
                    Err(RecvTimeoutError::Timeout) => housekeep(),
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .expect("spawning the dispatch thread must succeed");
        Dispatcher {
            tx,
            thread: parking_lot::Mutex::new(Some(thread)),
        }
    }

    /// Queue a callback invocation.
    pub fn enqueue(&self, callback: Callback, entity: Handle, event: StatusEvent) {
        let _ = self.tx.send(DispatchItem::Invoke {
            callback,
            entity,
            event,
        });
    }

    /// Stop the thread after draining queued callbacks.
    pub fn shutdown(&self) {
        let _ = self.tx.send(DispatchItem::Shutdown);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
