//! The 16-slot call stack.
//!
//! A shift register rather than a pointer-addressed stack: a push moves every
//! slot down and drops whatever was in the last one, a pop moves everything
//! up and zero-fills the bottom. There is no depth counter, so overflow and
//! underflow can only be guessed from slot contents.

use serde::{Serialize, Deserialize};

/// Number of return addresses the stack holds.
pub const STACK_DEPTH: usize = 16;

const ADDRESS_MASK: u16 = 0x3FF;

/// What a push observed about the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEvent {
    Ok,
    /// The last slot was occupied before a push and has been discarded.
    Overflow { dropped: u16 },
}

/// The TRC3 call stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStack {
    slots: [u16; STACK_DEPTH],
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.slots = [0; STACK_DEPTH];
    }

    /// Push a return address (masked to 10 bits) onto slot 0.
    pub fn push(&mut self, address: u16) -> StackEvent {
        let dropped = self.slots[STACK_DEPTH - 1];
        self.slots.copy_within(0..STACK_DEPTH - 1, 1);
        self.slots[0] = address & ADDRESS_MASK;

        if dropped != 0 {
            StackEvent::Overflow { dropped }
        } else {
            StackEvent::Ok
        }
    }

    /// Pop slot 0. Returns `None` when the stack looks empty (all slots zero),
    /// in which case nothing moves.
    pub fn pop(&mut self) -> Option<u16> {
        if self.looks_empty() {
            return None;
        }

        let top = self.slots[0];
        self.slots.copy_within(1.., 0);
        self.slots[STACK_DEPTH - 1] = 0;
        Some(top & ADDRESS_MASK)
    }

    /// Heuristic emptiness check used by the hardware: sum of all slots is 0.
    pub fn looks_empty(&self) -> bool {
        self.slots.iter().all(|&s| s == 0)
    }

    /// Slot contents, top first.
    pub fn slots(&self) -> &[u16; STACK_DEPTH] {
        &self.slots
    }
}
