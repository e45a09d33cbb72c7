//! Single-slot blocking handoff between a UI thread and the CPU thread.
//!
//! The CPU thread is the only one that ever blocks: it calls [`Handoff::get`]
//! and waits. A producer calls [`Handoff::give`], which succeeds only while a
//! `get` is pending. Values offered with nobody waiting are dropped, and each
//! `get` receives exactly one value.

use std::sync::{Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Slot {
    waiting: bool,
    value: Option<u8>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct Handoff {
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl Handoff {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // Slot holds plain data, so a poisoned lock is still consistent
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until a producer gives a value. Returns `None` once closed.
    pub fn get(&self) -> Option<u8> {
        let mut slot = self.lock();
        if slot.closed {
            return None;
        }
        slot.waiting = true;
        slot.value = None;

        while slot.value.is_none() && !slot.closed {
            slot = self.ready.wait(slot).unwrap_or_else(|e| e.into_inner());
        }

        slot.waiting = false;
        slot.value.take()
    }

    /// Offer a value to a pending `get`. Returns whether it was taken.
    pub fn give(&self, value: u8) -> bool {
        let mut slot = self.lock();
        if !slot.waiting || slot.closed || slot.value.is_some() {
            return false;
        }
        slot.value = Some(value);
        self.ready.notify_all();
        true
    }

    /// Whether a consumer is currently blocked in `get`.
    pub fn is_waiting(&self) -> bool {
        let slot = self.lock();
        slot.waiting && slot.value.is_none()
    }

    /// Release any pending `get` and refuse all future ones.
    pub fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn wait_until_pending(handoff: &Handoff) {
        while !handoff.is_waiting() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_give_without_pending_get_is_dropped() {
        let handoff = Handoff::new();
        assert!(!handoff.give(b'x'));
        assert!(!handoff.is_waiting());
    }

    #[test]
    fn test_get_receives_exactly_one_value() {
        let handoff = Arc::new(Handoff::new());
        let consumer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || handoff.get())
        };

        wait_until_pending(&handoff);
        assert!(handoff.give(b'a'));
        // Slot is full until the consumer wakes, later gives are dropped
        assert!(!handoff.give(b'b'));

        assert_eq!(consumer.join().unwrap(), Some(b'a'));
        assert!(!handoff.is_waiting());
        assert!(!handoff.give(b'c'));
    }

    #[test]
    fn test_consecutive_gets() {
        let handoff = Arc::new(Handoff::new());
        let consumer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || vec![handoff.get(), handoff.get()])
        };

        for value in [1, 2] {
            wait_until_pending(&handoff);
            while !handoff.give(value) {
                thread::yield_now();
            }
        }

        assert_eq!(consumer.join().unwrap(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_close_releases_blocked_get() {
        let handoff = Arc::new(Handoff::new());
        let consumer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || handoff.get())
        };

        wait_until_pending(&handoff);
        handoff.close();

        assert_eq!(consumer.join().unwrap(), None);
        assert!(handoff.is_closed());
        assert_eq!(handoff.get(), None);
        assert!(!handoff.give(1));
    }
}
