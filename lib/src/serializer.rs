// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Single-slot device access serializer
//!
//! At most one operation drives a device at a time. A request arriving
//! while the slot is held cancels the holder's device interaction and
//! then takes over the slot, rather than queueing behind an operation
//! that may be waiting indefinitely on user input.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, trace};

use crate::{Error, Session};

#[derive(Debug, Default)]
struct Slot {
    /// Current holder id, if any
    holder: Option<u64>,
    /// Next id to hand out
    next: u64,
}

impl Slot {
    fn take(&mut self) -> u64 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        self.holder = Some(id);
        id
    }
}

/// Device access serializer, cheap to clone and shared per device
#[derive(Clone, Debug, Default)]
pub struct Serializer {
    slot: Arc<Mutex<Slot>>,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        match self.slot.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        }
    }

    /// Acquire the device slot, cancelling the current holder's
    /// interaction via `session` if the slot is taken.
    ///
    /// Errors from the cancel request are returned as-is and leave the
    /// slot with its current holder.
    pub async fn acquire<S: Session + ?Sized>(&self, session: &S) -> Result<SlotGuard, Error> {
        {
            let mut s = self.lock();
            if s.holder.is_none() {
                let id = s.take();
                trace!("Acquired device slot {}", id);
                return Ok(SlotGuard::new(self.slot.clone(), id));
            }
        }

        debug!("Device busy, cancelling ongoing operation");

        session.cancel().await?;

        let mut s = self.lock();
        if let Some(prev) = s.holder {
            debug!("Preempting device slot {}", prev);
        }
        let id = s.take();

        Ok(SlotGuard::new(self.slot.clone(), id))
    }

    /// Check whether the slot is currently free
    pub fn is_free(&self) -> bool {
        self.lock().holder.is_none()
    }
}

/// Exclusive device access, released on [SlotGuard::release] or drop
#[derive(Debug)]
pub struct SlotGuard {
    slot: Arc<Mutex<Slot>>,
    id: u64,
    released: bool,
}

impl SlotGuard {
    fn new(slot: Arc<Mutex<Slot>>, id: u64) -> Self {
        Self {
            slot,
            id,
            released: false,
        }
    }

    /// Release the slot, subsequent calls are no-ops.
    ///
    /// A guard whose slot has since been taken over leaves the new
    /// holder in place.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut s = match self.slot.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        };

        if s.holder == Some(self.id) {
            trace!("Released device slot {}", self.id);
            s.holder = None;
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.release();
    }
}
