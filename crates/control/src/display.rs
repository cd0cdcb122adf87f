//! Realized display window.
//!
//! `DisplayData` tracks which slots currently have materialized elements:
//! a contiguous window `[first_scrolling_slot, last_scrolling_slot]` of
//! visible slots plus two recycle pools (data rows, group headers).
//! Recycled elements stay allocated in the arena but are detached from any
//! slot; the grid refreshes them in place on reuse instead of rebuilding.

use std::collections::VecDeque;

use crate::rows::ElementId;
use crate::slots::Slot;

#[derive(Debug, Default)]
pub struct DisplayData {
    /// Realized elements in window order, one per visible slot.
    window: VecDeque<(Slot, ElementId)>,
    row_pool: Vec<ElementId>,
    header_pool: Vec<ElementId>,
}

impl DisplayData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_scrolling_slot(&self) -> Slot {
        self.window.front().map(|&(slot, _)| slot).unwrap_or(Slot::NONE)
    }

    pub fn last_scrolling_slot(&self) -> Slot {
        self.window.back().map(|&(slot, _)| slot).unwrap_or(Slot::NONE)
    }

    pub fn num_displayed_scrolling_elements(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// The realized element for a slot, if the slot is in the window.
    /// The window is small (a screenful), so a linear scan is fine.
    pub fn element_at_slot(&self, slot: Slot) -> Option<ElementId> {
        self.window.iter().find(|&&(s, _)| s == slot).map(|&(_, id)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, ElementId)> + '_ {
        self.window.iter().copied()
    }

    pub fn load_slot_at_top(&mut self, slot: Slot, id: ElementId) {
        debug_assert!(self.window.front().is_none_or(|&(s, _)| slot < s));
        self.window.push_front((slot, id));
    }

    pub fn load_slot_at_bottom(&mut self, slot: Slot, id: ElementId) {
        debug_assert!(self.window.back().is_none_or(|&(s, _)| s < slot));
        self.window.push_back((slot, id));
    }

    pub fn unload_slot_at_top(&mut self) -> Option<(Slot, ElementId)> {
        self.window.pop_front()
    }

    pub fn unload_slot_at_bottom(&mut self) -> Option<(Slot, ElementId)> {
        self.window.pop_back()
    }

    /// Detach an element into the appropriate recycle pool.
    pub fn recycle_row(&mut self, id: ElementId) {
        self.row_pool.push(id);
    }

    pub fn recycle_header(&mut self, id: ElementId) {
        self.header_pool.push(id);
    }

    pub fn take_recycled_row(&mut self) -> Option<ElementId> {
        self.row_pool.pop()
    }

    pub fn take_recycled_header(&mut self) -> Option<ElementId> {
        self.header_pool.pop()
    }

    /// Renumber window slots after an insertion of `count` slots at `at`.
    pub fn shift_for_insert(&mut self, at: usize, count: usize) {
        for (slot, _) in self.window.iter_mut() {
            if let Some(s) = slot.index() {
                if s >= at {
                    *slot = Slot::from_index(s + count);
                }
            }
        }
    }

    /// Renumber window slots after a removal. Elements whose slot was
    /// removed are drained and returned for the caller to free.
    pub fn shift_for_remove(&mut self, at: usize, count: usize) -> Vec<ElementId> {
        let mut dropped = Vec::new();
        self.window.retain(|&(slot, id)| {
            let keep = slot.index().is_none_or(|s| s < at || s >= at + count);
            if !keep {
                dropped.push(id);
            }
            keep
        });
        for (slot, _) in self.window.iter_mut() {
            if let Some(s) = slot.index() {
                if s >= at + count {
                    *slot = Slot::from_index(s - count);
                }
            }
        }
        dropped
    }

    /// Full unload: drain the window and both pools, returning every id so
    /// the caller can free the arena elements.
    pub fn reset(&mut self) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self.window.drain(..).map(|(_, id)| id).collect();
        ids.append(&mut self.row_pool);
        ids.append(&mut self.header_pool);
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds_track_loads() {
        let mut display = DisplayData::new();
        assert_eq!(display.first_scrolling_slot(), Slot::NONE);

        display.load_slot_at_bottom(Slot(3), ElementId(0));
        display.load_slot_at_bottom(Slot(4), ElementId(1));
        display.load_slot_at_top(Slot(2), ElementId(2));

        assert_eq!(display.first_scrolling_slot(), Slot(2));
        assert_eq!(display.last_scrolling_slot(), Slot(4));
        assert_eq!(display.num_displayed_scrolling_elements(), 3);
        assert_eq!(display.element_at_slot(Slot(3)), Some(ElementId(0)));
        assert_eq!(display.element_at_slot(Slot(9)), None);
    }

    #[test]
    fn test_unload_returns_edges() {
        let mut display = DisplayData::new();
        display.load_slot_at_bottom(Slot(0), ElementId(0));
        display.load_slot_at_bottom(Slot(1), ElementId(1));

        assert_eq!(display.unload_slot_at_top(), Some((Slot(0), ElementId(0))));
        assert_eq!(display.unload_slot_at_bottom(), Some((Slot(1), ElementId(1))));
        assert!(display.unload_slot_at_top().is_none());
    }

    #[test]
    fn test_recycle_pools_are_separate() {
        let mut display = DisplayData::new();
        display.recycle_row(ElementId(1));
        display.recycle_header(ElementId(2));

        assert_eq!(display.take_recycled_header(), Some(ElementId(2)));
        assert_eq!(display.take_recycled_row(), Some(ElementId(1)));
        assert!(display.take_recycled_row().is_none());
    }

    #[test]
    fn test_shift_for_insert_renumbers() {
        let mut display = DisplayData::new();
        display.load_slot_at_bottom(Slot(1), ElementId(0));
        display.load_slot_at_bottom(Slot(3), ElementId(1));

        display.shift_for_insert(2, 2);
        assert_eq!(display.element_at_slot(Slot(1)), Some(ElementId(0)));
        assert_eq!(display.element_at_slot(Slot(5)), Some(ElementId(1)));
    }

    #[test]
    fn test_shift_for_remove_drains_removed() {
        let mut display = DisplayData::new();
        display.load_slot_at_bottom(Slot(1), ElementId(0));
        display.load_slot_at_bottom(Slot(2), ElementId(1));
        display.load_slot_at_bottom(Slot(4), ElementId(2));

        let dropped = display.shift_for_remove(2, 1);
        assert_eq!(dropped, vec![ElementId(1)]);
        assert_eq!(display.element_at_slot(Slot(1)), Some(ElementId(0)));
        assert_eq!(display.element_at_slot(Slot(3)), Some(ElementId(2)));
    }

    #[test]
    fn test_reset_drains_everything() {
        let mut display = DisplayData::new();
        display.load_slot_at_bottom(Slot(0), ElementId(0));
        display.recycle_row(ElementId(1));
        display.recycle_header(ElementId(2));

        let mut ids = display.reset();
        ids.sort_by_key(|id| id.0);
        assert_eq!(ids, vec![ElementId(0), ElementId(1), ElementId(2)]);
        assert!(display.is_empty());
    }
}
