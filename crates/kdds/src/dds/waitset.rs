// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! WaitSet: block until at least one attached condition triggers.
//!
//! Backed by a mutex/condvar pair. The triggered list is computed while
//! the waitset lock is held, and conditions signal through the lock, so a
//! trigger flipping between evaluation and sleep can never be lost.

use super::condition::{Condition, HasStatusCondition};
use crate::core::retcode::{ReturnCode, Result};
use crate::core::signal::WaitsetSignal;
use crate::core::time::{Duration, MonotonicTime};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

struct WaitSetCore {
    /// Set by condition signals, consumed by `wait`.
    flagged: Mutex<bool>,
    wake: Condvar,
}

struct WaitSetSignal {
    id: u64,
    core: Weak<WaitSetCore>,
}

impl WaitsetSignal for WaitSetSignal {
    fn id(&self) -> u64 {
        self.id
    }

    fn signal(&self) {
        if let Some(core) = self.core.upgrade() {
            let mut flagged = core.flagged.lock();
            *flagged = true;
            core.wake.notify_all();
        }
    }
}

/// A set of conditions and a blocking wait over them.
pub struct WaitSet {
    core: Arc<WaitSetCore>,
    signal: Arc<dyn WaitsetSignal>,
    conditions: Mutex<Vec<Arc<dyn Condition>>>,
}

impl WaitSet {
    #[must_use]
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1_000_000_000);
        let core = Arc::new(WaitSetCore {
            flagged: Mutex::new(false),
            wake: Condvar::new(),
        });
        let signal: Arc<dyn WaitsetSignal> = Arc::new(WaitSetSignal {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            core: Arc::downgrade(&core),
        });
        WaitSet {
            core,
            signal,
            conditions: Mutex::new(Vec::new()),
        }
    }

    /// Attach a condition. Attaching the same condition twice is a no-op.
    pub fn attach_condition(&self, condition: Arc<dyn Condition>) -> Result<()> {
        let id = condition.condition_id();
        let mut conditions = self.conditions.lock();
        if conditions.iter().any(|c| c.condition_id() == id) {
            return Ok(());
        }
        condition.add_waitset_signal(&self.signal);
        conditions.push(condition);
        Ok(())
    }

    /// Attach an entity's status condition (convenience).
    pub fn attach<E: HasStatusCondition>(&self, entity: &E) -> Result<()> {
        self.attach_condition(entity.status_condition())
    }

    /// Detach a condition; detaching one that is not attached fails with
    /// `PreconditionNotMet`.
    pub fn detach_condition(&self, condition: &Arc<dyn Condition>) -> Result<()> {
        let id = condition.condition_id();
        let mut conditions = self.conditions.lock();
        let before = conditions.len();
        conditions.retain(|c| c.condition_id() != id);
        if conditions.len() == before {
            return Err(ReturnCode::PreconditionNotMet);
        }
        condition.remove_waitset_signal(self.signal.id());
        Ok(())
    }

    /// Currently attached conditions.
    #[must_use]
    pub fn conditions(&self) -> Vec<Arc<dyn Condition>> {
        self.conditions.lock().clone()
    }

    /// Wait until at least one attached condition is triggered or the
    /// timeout elapses (`Timeout`). The returned list holds every
    /// condition that was triggered at wake-up time.
    pub fn wait(&self, timeout: Duration) -> Result<Vec<Arc<dyn Condition>>> {
        let deadline = MonotonicTime::deadline_after(timeout);
        let mut flagged = self.core.flagged.lock();
        loop {
            *flagged = false;
            // Evaluate inside the critical section: a signal racing with
            // this scan blocks on the mutex and sets the flag after.
            let triggered: Vec<Arc<dyn Condition>> = self
                .conditions
                .lock()
                .iter()
                .filter(|c| c.trigger_value())
                .cloned()
                .collect();
            if !triggered.is_empty() {
                return Ok(triggered);
            }
            while !*flagged {
                if deadline.has_passed() {
                    return Err(ReturnCode::Timeout);
                }
                let remaining = deadline.remaining();
                if remaining.is_infinite() {
                    self.core.wake.wait(&mut flagged);
                } else {
                    let _ = self.core.wake.wait_for(&mut flagged, remaining.to_std());
                }
            }
        }
    }
}

impl Default for WaitSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WaitSet {
    fn drop(&mut self) {
        let conditions = self.conditions.lock();
        for condition in conditions.iter() {
            condition.remove_waitset_signal(self.signal.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dds::condition::GuardCondition;
    use std::time::Instant;

    #[test]
    fn test_empty_waitset_times_out() {
        let ws = WaitSet::new();
        let start = Instant::now();
        let result = ws.wait(Duration::from_millis(50));
        assert_eq!(result.err(), Some(ReturnCode::Timeout));
        assert!(start.elapsed() >= std::time::Duration::from_millis(40));
    }

    #[test]
    fn test_attach_idempotent() {
        let ws = WaitSet::new();
        let guard: Arc<dyn Condition> = Arc::new(GuardCondition::new());
        ws.attach_condition(Arc::clone(&guard)).expect("attach");
        ws.attach_condition(Arc::clone(&guard)).expect("re-attach is a no-op");
        assert_eq!(ws.conditions().len(), 1);
    }

    #[test]
    fn test_detach_not_attached() {
        let ws = WaitSet::new();
        let guard: Arc<dyn Condition> = Arc::new(GuardCondition::new());
        assert_eq!(
            ws.detach_condition(&guard).err(),
            Some(ReturnCode::PreconditionNotMet)
        );
    }

    #[test]
    fn test_pretriggered_returns_immediately() {
        let ws = WaitSet::new();
        let guard = Arc::new(GuardCondition::new());
        guard.set_trigger_value(true);
        ws.attach_condition(guard.clone()).expect("attach");
        let triggered = ws.wait(Duration::from_secs(5)).expect("wait");
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].condition_id(), guard.condition_id());
    }

    #[test]
    fn test_cross_thread_wake() {
        let ws = Arc::new(WaitSet::new());
        let guard = Arc::new(GuardCondition::new());
        ws.attach_condition(guard.clone()).expect("attach");

        let guard2 = Arc::clone(&guard);
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(30));
            guard2.set_trigger_value(true);
        });

        let start = Instant::now();
        let triggered = ws.wait(Duration::from_secs(5)).expect("wait");
        assert_eq!(triggered.len(), 1);
        assert!(start.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_wait_after_clear_times_out_again() {
        let ws = WaitSet::new();
        let guard = Arc::new(GuardCondition::new());
        ws.attach_condition(guard.clone()).expect("attach");
        guard.set_trigger_value(true);
        ws.wait(Duration::from_millis(100)).expect("wait");
        guard.set_trigger_value(false);
        assert_eq!(
            ws.wait(Duration::from_millis(30)).err(),
            Some(ReturnCode::Timeout)
        );
    }

    #[test]
    fn test_detach_stops_wakeups() {
        let ws = WaitSet::new();
        let guard = Arc::new(GuardCondition::new());
        ws.attach_condition(guard.clone()).expect("attach");
        let as_condition: Arc<dyn Condition> = guard.clone();
        ws.detach_condition(&as_condition).expect("detach");
        guard.set_trigger_value(true);
        assert_eq!(
            ws.wait(Duration::from_millis(30)).err(),
            Some(ReturnCode::Timeout)
        );
    }
}
