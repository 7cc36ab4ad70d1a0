// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Waitset wake-up plumbing shared by all condition kinds.
//!
//! A condition that flips to triggered must wake every waitset it is
//! attached to. Waitsets register a [`WaitsetSignal`] with the condition;
//! the condition keeps weak references so a dropped waitset cleans itself
//! up lazily.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Wake-up channel into a waitset.
pub trait WaitsetSignal: Send + Sync {
    /// Identifier used to remove the signal on detach.
    fn id(&self) -> u64;

    /// Wake the waitset.
    fn signal(&self);
}

struct Hook {
    id: u64,
    signal: Weak<dyn WaitsetSignal>,
}

/// Set of registered waitset signals with the usual add/remove/notify
/// discipline.
#[derive(Default)]
pub struct SignalSet {
    hooks: Mutex<Vec<Hook>>,
}

impl SignalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signal, dropping any dead hooks on the way.
    pub fn add(&self, signal: &Arc<dyn WaitsetSignal>) {
        let mut hooks = self.hooks.lock();
        hooks.retain(|hook| hook.signal.upgrade().is_some());
        hooks.push(Hook {
            id: signal.id(),
            signal: Arc::downgrade(signal),
        });
    }

    /// Remove the signal with the given id.
    pub fn remove(&self, signal_id: u64) {
        self.hooks.lock().retain(|hook| hook.id != signal_id);
    }

    /// Wake all registered waitsets.
    pub fn notify(&self) {
        let mut hooks = self.hooks.lock();
        hooks.retain(|hook| {
            if let Some(signal) = hook.signal.upgrade() {
                signal.signal();
                true
            } else {
                false
            }
        });
    }
}
