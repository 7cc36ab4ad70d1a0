// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 kdds developers

//! Handle table: integer handles with generation-counted reuse.
//!
//! Handles are positive 32-bit integers. The low [`INDEX_BITS`] select a
//! slot; the bits above carry a generation counter that changes every time
//! a slot is reclaimed, so a stale handle never resolves to a newer
//! occupant (ABA protection). The generation starts at 1, which also keeps
//! every valid handle strictly positive.
//!
//! Lifecycle of a slot: `insert` -> Open -> `close` (no new pins) ->
//! `delete` (waits for the pin count to reach zero, then frees the slot).
//! A pinned entity stays accessible after `close`; operations that pin a
//! closed slot get `AlreadyDeleted`.
//!
//! Deadlock rule: a thread holding a pin must not call [`HandleTable::delete`]
//! on the same handle; delete blocks until all pins are released.

use crate::core::retcode::{ReturnCode, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Number of index bits in a handle.
const INDEX_BITS: u32 = 15;
const INDEX_MASK: i32 = (1 << INDEX_BITS) - 1;
/// Generation wraps within 1..=GEN_MAX so a handle is never zero.
const GEN_MAX: u16 = (1 << 15) - 1;

/// Positive integer handle referring to a table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(i32);

impl Handle {
    /// The nil handle (never valid).
    pub const NIL: Handle = Handle(0);

    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Wrap a raw value. No validation; resolve through the table.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Handle(raw)
    }

    const fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    const fn generation(self) -> u16 {
        ((self.0 >> INDEX_BITS) & 0x7fff) as u16
    }

    fn compose(index: usize, generation: u16) -> Self {
        Handle(((generation as i32) << INDEX_BITS) | (index as i32))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Open,
    Closed,
}

struct Slot<T> {
    generation: u16,
    state: SlotState,
    pins: u32,
    entity: Option<Arc<T>>,
}

struct TableState<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    live: usize,
}

/// Generation-counted handle table.
pub struct HandleTable<T> {
    state: Mutex<TableState<T>>,
    unpinned: Condvar,
    capacity: usize,
}

impl<T> HandleTable<T> {
    /// Create a table with room for `capacity` live handles
    /// (clamped to the handle index space).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        HandleTable {
            state: Mutex::new(TableState {
                slots: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
            unpinned: Condvar::new(),
            capacity: capacity.min(1 << INDEX_BITS),
        }
    }

    /// Insert an entity, handing the freshly allocated handle to the
    /// constructor so the entity can record its own identity.
    pub fn insert(&self, make: impl FnOnce(Handle) -> Arc<T>) -> Result<Handle> {
        let mut st = self.state.lock();
        let index = match st.free.pop() {
            Some(i) => i,
            None => {
                if st.slots.len() >= self.capacity {
                    return Err(ReturnCode::OutOfResources);
                }
                st.slots.push(Slot {
                    generation: 1,
                    state: SlotState::Free,
                    pins: 0,
                    entity: None,
                });
                st.slots.len() - 1
            }
        };
        let generation = st.slots[index].generation;
        let handle = Handle::compose(index, generation);
        let entity = make(handle);
        let slot = &mut st.slots[index];
        slot.state = SlotState::Open;
        slot.pins = 0;
        slot.entity = Some(entity);
        st.live += 1;
        Ok(handle)
    }

    fn resolve<'a>(st: &'a mut TableState<T>, handle: Handle) -> Result<&'a mut Slot<T>> {
        let index = handle.index();
        if handle.raw() <= 0 || index >= st.slots.len() {
            return Err(ReturnCode::BadParameter);
        }
        let slot = &mut st.slots[index];
        if slot.state == SlotState::Free || slot.generation != handle.generation() {
            return Err(ReturnCode::BadParameter);
        }
        Ok(slot)
    }

    /// Pin the entity behind `handle`. Fails with `AlreadyDeleted` once the
    /// slot has been closed, `BadParameter` for stale or unknown handles.
    pub fn pin(&self, handle: Handle) -> Result<Pinned<'_, T>> {
        let mut st = self.state.lock();
        let slot = Self::resolve(&mut st, handle)?;
        if slot.state == SlotState::Closed {
            return Err(ReturnCode::AlreadyDeleted);
        }
        slot.pins += 1;
        let entity = Arc::clone(slot.entity.as_ref().expect("open slot has entity"));
        Ok(Pinned {
            table: self,
            handle,
            entity,
        })
    }

    fn unpin(&self, handle: Handle) {
        let mut st = self.state.lock();
        if let Ok(slot) = Self::resolve(&mut st, handle) {
            slot.pins = slot.pins.saturating_sub(1);
            if slot.pins == 0 && slot.state == SlotState::Closed {
                self.unpinned.notify_all();
            }
        }
    }

    /// Mark the slot closed: existing pins stay valid, new pins fail.
    /// Returns `AlreadyDeleted` if it was closed before.
    pub fn close(&self, handle: Handle) -> Result<()> {
        let mut st = self.state.lock();
        let slot = Self::resolve(&mut st, handle)?;
        if slot.state == SlotState::Closed {
            return Err(ReturnCode::AlreadyDeleted);
        }
        slot.state = SlotState::Closed;
        Ok(())
    }

    /// Close (if not already closed), wait for all pins to drain and free
    /// the slot. Returns the entity for final teardown.
    pub fn delete(&self, handle: Handle) -> Result<Arc<T>> {
        let mut st = self.state.lock();
        {
            let slot = Self::resolve(&mut st, handle)?;
            slot.state = SlotState::Closed;
        }
        loop {
            let slot = Self::resolve(&mut st, handle)?;
            if slot.pins == 0 {
                let entity = slot.entity.take().expect("closed slot has entity");
                slot.state = SlotState::Free;
                slot.generation = if slot.generation >= GEN_MAX {
                    1
                } else {
                    slot.generation + 1
                };
                let index = handle.index();
                st.free.push(index);
                st.live -= 1;
                return Ok(entity);
            }
            self.unpinned.wait(&mut st);
        }
    }

    /// Look up without pinning. Unlike [`Self::pin`] this also resolves
    /// closed-but-not-yet-reclaimed slots; used internally where teardown
    /// must still reach a record that no longer accepts operations.
    pub fn peek(&self, handle: Handle) -> Result<Arc<T>> {
        let mut st = self.state.lock();
        let slot = Self::resolve(&mut st, handle)?;
        Ok(Arc::clone(slot.entity.as_ref().expect("resolved slot has entity")))
    }

    /// Number of live (inserted, not yet deleted) handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pin guard: keeps the entity alive and the slot pinned until dropped.
pub struct Pinned<'a, T> {
    table: &'a HandleTable<T>,
    handle: Handle,
    entity: Arc<T>,
}

impl<T> Pinned<'_, T> {
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Clone out the underlying `Arc` (does not extend the pin).
    #[must_use]
    pub fn entity(&self) -> Arc<T> {
        Arc::clone(&self.entity)
    }
}

impl<T> std::ops::Deref for Pinned<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.entity
    }
}

impl<T> Drop for Pinned<'_, T> {
    fn drop(&mut self) {
        self.table.unpin(self.handle);
    }
}
