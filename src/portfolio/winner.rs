use std::fmt;

use parking_lot::Mutex;

/// Result of the instance that finished first with a sound and precise result.
pub struct Winner<R> {
    /// 1-based instance number, in configuration order.
    pub instance: usize,
    pub name: String,
    pub reached: R,
}

impl<R> fmt::Debug for Winner<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Winner")
            .field("instance", &self.instance)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

enum Slot<R> {
    Empty,
    Committed(Winner<R>),
    Sealed,
}

/// Write-once slot for the winning result.
///
/// The first [`try_commit`][Self::try_commit] wins; [`take`][Self::take]
/// seals the slot so that results arriving afterwards are dropped.
pub struct WinnerSlot<R> {
    slot: Mutex<Slot<R>>,
}

impl<R> WinnerSlot<R> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Store `winner` unless a result was already stored or the slot is sealed.
    pub fn try_commit(&self, winner: Winner<R>) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Empty) {
            return false;
        }
        *slot = Slot::Committed(winner);
        true
    }

    pub fn is_committed(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Committed(_))
    }

    /// Take the winner (if any) and seal the slot.
    pub fn take(&self) -> Option<Winner<R>> {
        match std::mem::replace(&mut *self.slot.lock(), Slot::Sealed) {
            Slot::Committed(winner) => Some(winner),
            Slot::Empty | Slot::Sealed => None,
        }
    }
}

impl<R> Default for WinnerSlot<R> {
    fn default() -> Self {
        Self::new()
    }
}
