//! Slot arithmetic and visibility.
//!
//! A slot is an index into one contiguous space covering data rows and
//! group headers: `slot_count = row_count + group_header_count`. A data
//! slot's row index is the slot minus the number of header slots below it.
//! Collapsed slots keep their numbers; collapse only affects visibility.

use crate::slot_table::{CollapsedSlotsTable, RowGroupHeadersTable};

/// A slot number. `Slot::NONE` (-1) is the "no current slot" sentinel;
/// one-past-the-end marks "no next visible slot".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(pub isize);

impl Slot {
    pub const NONE: Slot = Slot(-1);

    pub fn from_index(index: usize) -> Self {
        Slot(index as isize)
    }

    pub fn is_none(&self) -> bool {
        self.0 < 0
    }

    /// The slot as a table index; None for the sentinel.
    pub fn index(&self) -> Option<usize> {
        (self.0 >= 0).then_some(self.0 as usize)
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The grid's slot space: header and collapsed bookkeeping plus the total
/// slot count.
#[derive(Debug, Clone, Default)]
pub struct SlotSpace {
    pub headers: RowGroupHeadersTable,
    pub collapsed: CollapsedSlotsTable,
    slot_count: usize,
}

impl SlotSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn row_count(&self) -> usize {
        self.slot_count - self.headers.len()
    }

    pub fn contains(&self, slot: Slot) -> bool {
        slot.index().is_some_and(|s| s < self.slot_count)
    }

    /// Grow the space by `count` contiguous slots at the end.
    pub fn extend(&mut self, count: usize) {
        self.slot_count += count;
    }

    /// Rebuild from scratch: clears both tables and sets the count.
    pub fn reset(&mut self, slot_count: usize) {
        self.headers.clear();
        self.collapsed.clear();
        self.slot_count = slot_count;
    }

    /// Insert `count` slots at `at`, renumbering both tables.
    pub fn insert_slots(&mut self, at: usize, count: usize) {
        debug_assert!(at <= self.slot_count);
        self.headers.insert_index_shift(at, count);
        self.collapsed.insert_index_shift(at, count);
        self.slot_count += count;
    }

    /// Remove `count` slots starting at `at`, renumbering both tables.
    pub fn remove_slots(&mut self, at: usize, count: usize) {
        debug_assert!(at + count <= self.slot_count);
        self.headers.remove_index_shift(at, count);
        self.collapsed.remove_index_shift(at, count);
        self.slot_count -= count;
    }

    pub fn is_header(&self, slot: Slot) -> bool {
        slot.index().is_some_and(|s| self.headers.is_header(s))
    }

    pub fn is_collapsed(&self, slot: Slot) -> bool {
        slot.index().is_some_and(|s| self.collapsed.contains(s))
    }

    /// Row index of a data slot; None for headers, the sentinel, and
    /// out-of-range slots.
    pub fn row_index_from_slot(&self, slot: Slot) -> Option<usize> {
        let s = slot.index().filter(|&s| s < self.slot_count)?;
        if self.headers.is_header(s) {
            return None;
        }
        Some(s - self.headers.count_before(s))
    }

    /// Slot of a data row. Iterates to the fixed point of
    /// `slot = row + headers_at_or_below(slot)`; converges in at most
    /// one step per header run.
    pub fn slot_from_row_index(&self, row: usize) -> Option<Slot> {
        if row >= self.row_count() {
            return None;
        }
        let mut candidate = row;
        loop {
            let next = row + self.headers.count_at_or_before(candidate);
            if next == candidate {
                debug_assert!(!self.headers.is_header(candidate));
                return Some(Slot::from_index(candidate));
            }
            candidate = next;
        }
    }

    /// Nearest non-collapsed slot strictly after `slot`; one-past-the-end
    /// when none. Gap-search: jump over whole collapsed ranges.
    pub fn next_visible_slot(&self, slot: Slot) -> Slot {
        let mut candidate = (slot.0 + 1).max(0) as usize;
        while candidate < self.slot_count {
            match self.collapsed.range_end_of(candidate) {
                Some(end) => candidate = end + 1,
                None => return Slot::from_index(candidate),
            }
        }
        Slot(self.slot_count as isize)
    }

    /// Nearest non-collapsed slot strictly before `slot`; `Slot::NONE`
    /// when none.
    pub fn previous_visible_slot(&self, slot: Slot) -> Slot {
        let upper = if slot.is_none() {
            return Slot::NONE;
        } else {
            (slot.0 as usize).min(self.slot_count)
        };
        let mut candidate = upper as isize - 1;
        while candidate >= 0 {
            match self.collapsed.range_start_of(candidate as usize) {
                Some(start) => candidate = start as isize - 1,
                None => return Slot(candidate),
            }
        }
        Slot::NONE
    }

    /// First visible slot in the space, or the one-past-the-end sentinel.
    pub fn first_visible_slot(&self) -> Slot {
        self.next_visible_slot(Slot::NONE)
    }
}
