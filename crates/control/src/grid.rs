//! The grid control model.
//!
//! `DataGrid<T>` composes the slot space, the sort/filter view, grouping,
//! the realized display window, and the edit state machine over a
//! `RowsSource`. Invariants:
//! - slot space covers visible (filtered-in) rows plus group headers
//! - collapse/expand touch visibility only, never slot numbering
//! - every `*Ending` event is cancellable, and current-cell identity is
//!   re-validated after each subscriber callback

use gridkit_config::GridSettings;
use gridkit_core::{
    ColumnId, ConditionalFormatting, DescriptorSet, FilterDescriptor, SortDescriptor, StyleHint,
    Value,
};
use gridkit_export::ExportContext;

use crate::collection::{CollectionChange, RowsSource};
use crate::columns::{ColumnCollection, GridColumn};
use crate::display::DisplayData;
use crate::editing::{CurrentCell, EditState, EditingUnit};
use crate::error::GridError;
use crate::events::{EditAction, EventHub, GridEvent};
use crate::grouping::{build_groups, GroupDescription};
use crate::row_view::{filter_mask, search_hits, sort_permutation, RowView};
use crate::rows::{
    generate_group_header, generate_row, refresh_row, ElementArena, ElementId, GridElement,
    GridRow,
};
use crate::slot_table::GroupInfo;
use crate::slots::{Slot, SlotSpace};

pub struct DataGrid<T> {
    columns: ColumnCollection<T>,
    source: Box<dyn RowsSource<T>>,
    view: RowView,
    /// Data row per grid row index (group order when grouped, view order
    /// otherwise).
    row_order: Vec<usize>,
    slots: SlotSpace,
    display: DisplayData,
    arena: ElementArena,
    events: EventHub,
    edit_state: EditState,
    current: CurrentCell,
    pub settings: GridSettings,
    pub sorts: DescriptorSet<SortDescriptor>,
    pub filters: DescriptorSet<FilterDescriptor>,
    pub formatting: ConditionalFormatting,
    grouping: Option<GroupDescription<T>>,
    viewport_height: f32,
}

impl<T> DataGrid<T> {
    pub fn new(source: impl RowsSource<T> + 'static, settings: GridSettings) -> Self {
        let viewport_height = settings.row_height * 20.0;
        Self {
            columns: ColumnCollection::new(),
            source: Box::new(source),
            view: RowView::new(0),
            row_order: Vec::new(),
            slots: SlotSpace::new(),
            display: DisplayData::new(),
            arena: ElementArena::new(),
            events: EventHub::new(),
            edit_state: EditState::Idle,
            current: CurrentCell::none(),
            settings,
            sorts: DescriptorSet::new(),
            filters: DescriptorSet::new(),
            formatting: ConditionalFormatting::new(),
            grouping: None,
            viewport_height,
        }
    }

    // ========================================================================
    // Composition
    // ========================================================================

    pub fn add_column(&mut self, column: GridColumn<T>) -> ColumnId {
        self.columns.add(column)
    }

    pub fn columns(&self) -> &ColumnCollection<T> {
        &self.columns
    }

    pub fn source(&self) -> &dyn RowsSource<T> {
        self.source.as_ref()
    }

    pub fn events_mut(&mut self) -> &mut EventHub {
        &mut self.events
    }

    pub fn set_group_description(&mut self, description: GroupDescription<T>) {
        self.grouping = Some(description);
    }

    pub fn clear_grouping(&mut self) {
        self.grouping = None;
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height;
    }

    // ========================================================================
    // Slot queries
    // ========================================================================

    pub fn slot_count(&self) -> usize {
        self.slots.slot_count()
    }

    pub fn row_count(&self) -> usize {
        self.slots.row_count()
    }

    pub fn is_group_header(&self, slot: Slot) -> bool {
        self.slots.is_header(slot)
    }

    pub fn is_slot_collapsed(&self, slot: Slot) -> bool {
        self.slots.is_collapsed(slot)
    }

    /// Visible means not collapsed and currently materialized in the window.
    pub fn is_slot_visible(&self, slot: Slot) -> bool {
        !self.slots.is_collapsed(slot) && self.display.element_at_slot(slot).is_some()
    }

    pub fn row_index_from_slot(&self, slot: Slot) -> Option<usize> {
        self.slots.row_index_from_slot(slot)
    }

    pub fn slot_from_row_index(&self, row: usize) -> Option<Slot> {
        self.slots.slot_from_row_index(row)
    }

    pub fn next_visible_slot(&self, slot: Slot) -> Slot {
        self.slots.next_visible_slot(slot)
    }

    pub fn previous_visible_slot(&self, slot: Slot) -> Slot {
        self.slots.previous_visible_slot(slot)
    }

    /// Backing data row of a data slot.
    pub fn data_row_from_slot(&self, slot: Slot) -> Option<usize> {
        let row = self.slots.row_index_from_slot(slot)?;
        self.row_order.get(row).copied()
    }

    pub fn current_cell(&self) -> CurrentCell {
        self.current
    }

    /// Current cell as a concrete (slot, column) position.
    pub fn current_cell_position(&self) -> Result<(Slot, usize), GridError> {
        match self.current {
            CurrentCell { slot, column_index: Some(column) } if !slot.is_none() => {
                Ok((slot, column))
            }
            _ => Err(GridError::NoCurrentCell),
        }
    }

    pub fn edit_state(&self) -> EditState {
        self.edit_state
    }

    /// The cell under edit, for hosts driving an editor control.
    pub fn editing_cell(&self) -> Result<(Slot, usize), GridError> {
        match self.edit_state {
            EditState::CellEditing { slot, column_index } => Ok((slot, column_index)),
            _ => Err(GridError::NotEditing),
        }
    }

    /// Read a data cell's value through the column accessor.
    pub fn cell_value(&self, slot: Slot, column_index: usize) -> Result<Value, GridError> {
        if column_index >= self.columns.len() {
            return Err(GridError::ColumnOutOfRange {
                index: column_index,
                count: self.columns.len(),
            });
        }
        let out_of_range = || GridError::SlotOutOfRange {
            slot: slot.0,
            count: self.slots.slot_count(),
        };
        let data_row = self.data_row_from_slot(slot).ok_or_else(out_of_range)?;
        match (self.columns.get(column_index), self.source.get(data_row)) {
            (Some(column), Some(item)) => Ok(column.get_value(item)),
            _ => Err(out_of_range()),
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&GridElement> {
        self.arena.get(id)
    }

    pub fn row_at_slot(&self, slot: Slot) -> Option<&GridRow> {
        let id = self.display.element_at_slot(slot)?;
        self.arena.get(id)?.as_row()
    }

    pub fn num_displayed_scrolling_elements(&self) -> usize {
        self.display.num_displayed_scrolling_elements()
    }

    /// Allocated elements, window plus recycle pools. Stays bounded by the
    /// window size while scrolling.
    pub fn live_element_count(&self) -> usize {
        self.arena.live_count()
    }

    /// Conditional style for a cell, evaluated against the live item value.
    pub fn style_for_cell(&self, slot: Slot, column_index: usize) -> Option<&StyleHint> {
        let data_row = self.data_row_from_slot(slot)?;
        let item = self.source.get(data_row)?;
        let column = self.columns.get(column_index)?;
        self.formatting.style_for(column.id, &column.get_value(item))
    }

    pub fn search(&self, search: &gridkit_core::SearchDescriptor) -> Vec<(usize, usize)> {
        search_hits(self.source.as_ref(), &self.columns, &self.view, search)
    }

    // ========================================================================
    // Rebuild
    // ========================================================================

    /// Recompute the view from the descriptor sets, rebuild grouping and
    /// the slot space, and refill the display window. Any open edit is
    /// force-cancelled first.
    pub fn refresh(&mut self) {
        if self.edit_state.is_editing() {
            self.cancel_edit(EditingUnit::Row, true);
        }

        // The view always re-derives from the live source length; stale
        // incremental state is discarded before descriptors apply
        self.view.reset(self.source.len());

        if self.sorts.is_empty() {
            self.view.clear_sort();
        } else {
            let perm = sort_permutation(self.source.as_ref(), &self.columns, self.sorts.items());
            self.view.apply_sort(perm);
        }
        if self.filters.is_empty() {
            self.view.clear_filter();
        } else {
            let mask = filter_mask(self.source.as_ref(), &self.columns, self.filters.items());
            self.view.apply_filter(mask);
        }

        self.rebuild_slot_space();

        for id in self.display.reset() {
            self.arena.free(id);
        }
        if !self.slots.contains(self.current.slot) {
            self.current = CurrentCell::none();
        }

        log::debug!(
            "grid reset: {} rows, {} slots",
            self.slots.row_count(),
            self.slots.slot_count()
        );
        self.events.emit(GridEvent::RowsReset);
        self.fill_window_from(self.slots.first_visible_slot());
    }

    fn rebuild_slot_space(&mut self) {
        match &self.grouping {
            Some(description) => {
                let groups = build_groups(self.source.as_ref(), &self.view, description);
                let row_total: usize = groups.iter().map(|g| g.rows.len()).sum();
                self.slots.reset(row_total + groups.len());
                self.row_order.clear();
                let mut cursor = 0usize;
                for group in groups {
                    self.slots.headers.insert(
                        cursor,
                        GroupInfo { key: group.key, row_count: group.rows.len() },
                    );
                    cursor += 1 + group.rows.len();
                    self.row_order.extend(group.rows);
                }
            }
            None => {
                self.row_order = self.view.visible_rows().to_vec();
                self.slots.reset(self.row_order.len());
            }
        }
    }

    // ========================================================================
    // Window management
    // ========================================================================

    /// Materialize one slot at the bottom of the window.
    pub fn add_slot_element(&mut self, slot: Slot) -> Option<ElementId> {
        let id = self.realize_slot(slot)?;
        self.display.load_slot_at_bottom(slot, id);
        log::trace!("loaded slot {slot}");
        Some(id)
    }

    /// Bulk-fill the window downwards from the first visible slot until the
    /// height budget is spent. Returns the number of elements materialized;
    /// slots past the budget stay virtual.
    pub fn add_slots(&mut self, available_height: f32) -> usize {
        let start = if self.display.is_empty() {
            self.slots.first_visible_slot()
        } else {
            self.slots.next_visible_slot(self.display.last_scrolling_slot())
        };
        self.fill_with_budget(start, available_height)
    }

    /// Re-anchor the window at `start`. Displaced elements go to the
    /// recycle pools, not back to the arena, so the refill reuses them.
    fn fill_window_from(&mut self, start: Slot) -> usize {
        while let Some((_, id)) = self.display.unload_slot_at_top() {
            self.recycle_element(id);
        }
        self.fill_with_budget(start, self.viewport_height)
    }

    fn recycle_element(&mut self, id: ElementId) {
        match self.arena.get(id) {
            Some(GridElement::GroupHeader(_)) => self.display.recycle_header(id),
            Some(GridElement::Row(_)) => self.display.recycle_row(id),
            None => {}
        }
    }

    fn window_height(&self) -> f32 {
        self.display
            .iter()
            .map(|(slot, _)| {
                if self.slots.is_header(slot) {
                    self.settings.group_header_height
                } else {
                    self.settings.row_height
                }
            })
            .sum()
    }

    /// Unload bottom slots into the pools until the window fits the
    /// viewport again. Always keeps at least one element.
    fn trim_bottom_to_budget(&mut self) {
        while self.window_height() > self.viewport_height
            && self.display.num_displayed_scrolling_elements() > 1
        {
            if let Some((_, id)) = self.display.unload_slot_at_bottom() {
                self.recycle_element(id);
            } else {
                break;
            }
        }
    }

    fn fill_with_budget(&mut self, start: Slot, budget: f32) -> usize {
        let mut used = 0.0f32;
        let mut slot = start;
        let mut materialized = 0;
        while self.slots.contains(slot) {
            let height = if self.slots.is_header(slot) {
                self.settings.group_header_height
            } else {
                self.settings.row_height
            };
            if used + height > budget && materialized > 0 {
                break;
            }
            if self.add_slot_element(slot).is_none() {
                break;
            }
            used += height;
            materialized += 1;
            slot = self.slots.next_visible_slot(slot);
        }
        materialized
    }

    fn realize_slot(&mut self, slot: Slot) -> Option<ElementId> {
        let index = slot.index().filter(|&s| s < self.slots.slot_count())?;
        if let Some(info) = self.slots.headers.get(index) {
            let collapsed = info.row_count > 0 && self.slots.collapsed.contains(index + 1);
            return Some(match self.display.take_recycled_header() {
                Some(id) => {
                    if let Some(GridElement::GroupHeader(header)) = self.arena.get_mut(id) {
                        header.slot = slot;
                        header.info = info.clone();
                        header.collapsed = collapsed;
                    }
                    id
                }
                None => generate_group_header(&mut self.arena, slot, info.clone(), collapsed),
            });
        }

        let row_index = self.slots.row_index_from_slot(slot)?;
        let data_row = self.row_order.get(row_index).copied()?;
        let item = self.source.get(data_row)?;
        match self.display.take_recycled_row() {
            Some(id) => {
                refresh_row(&mut self.arena, &self.columns, item, id);
                if let Some(element) = self.arena.get_mut(id) {
                    element.set_slot(slot);
                    if let Some(row) = element.as_row_mut() {
                        row.row_index = row_index;
                    }
                }
                Some(id)
            }
            None => Some(generate_row(&mut self.arena, &self.columns, item, row_index, slot)),
        }
    }

    /// Make sure a slot is materialized, re-anchoring the window on it when
    /// it lies outside. Collapsed slots cannot be scrolled to.
    pub fn scroll_into_view(&mut self, slot: Slot) -> bool {
        if !self.slots.contains(slot) || self.slots.is_collapsed(slot) {
            return false;
        }
        if self.display.element_at_slot(slot).is_some() {
            return true;
        }

        // Scrolling up: grow the window at the top, trimming the bottom as
        // it overflows, so elements cycle through the recycle pools
        let first = self.display.first_scrolling_slot();
        if !first.is_none() && slot < first {
            log::trace!("scrolling window up to slot {slot}");
            let mut cursor = self.slots.previous_visible_slot(first);
            while !cursor.is_none() && cursor >= slot {
                let Some(id) = self.realize_slot(cursor) else {
                    break;
                };
                self.display.load_slot_at_top(cursor, id);
                self.trim_bottom_to_budget();
                cursor = self.slots.previous_visible_slot(cursor);
            }
            return self.display.element_at_slot(slot).is_some();
        }

        log::trace!("re-anchoring window at slot {slot}");
        self.fill_window_from(slot) > 0
    }

    // ========================================================================
    // Structural changes
    // ========================================================================

    /// Insert `count` data slots at `at`, renumbering tables and the window.
    pub fn insert_slot(&mut self, at: usize, count: usize) -> Result<(), GridError> {
        if at > self.slots.slot_count() {
            return Err(GridError::SlotOutOfRange {
                slot: at as isize,
                count: self.slots.slot_count(),
            });
        }
        self.slots.insert_slots(at, count);
        self.display.shift_for_insert(at, count);
        self.shift_current_for_insert(at, count);
        self.events.emit(GridEvent::SlotsInserted { slot: at, count });
        Ok(())
    }

    /// Remove `count` slots starting at `at`, freeing any realized elements.
    pub fn remove_slot(&mut self, at: usize, count: usize) -> Result<(), GridError> {
        if at + count > self.slots.slot_count() {
            return Err(GridError::SlotOutOfRange {
                slot: (at + count) as isize,
                count: self.slots.slot_count(),
            });
        }
        self.slots.remove_slots(at, count);
        for id in self.display.shift_for_remove(at, count) {
            self.arena.free(id);
        }
        self.shift_current_for_remove(at, count);
        self.events.emit(GridEvent::SlotsRemoved { slot: at, count });
        Ok(())
    }

    fn shift_current_for_insert(&mut self, at: usize, count: usize) {
        if let Some(s) = self.current.slot.index() {
            if s >= at {
                self.current.slot = Slot::from_index(s + count);
            }
        }
        if let Some(slot) = self.edit_state.editing_slot().and_then(|s| s.index()) {
            if slot >= at {
                let shifted = Slot::from_index(slot + count);
                self.edit_state = match self.edit_state {
                    EditState::RowEditing { .. } => EditState::RowEditing { slot: shifted },
                    EditState::CellEditing { column_index, .. } => {
                        EditState::CellEditing { slot: shifted, column_index }
                    }
                    EditState::Idle => EditState::Idle,
                };
            }
        }
    }

    fn shift_current_for_remove(&mut self, at: usize, count: usize) {
        if let Some(s) = self.current.slot.index() {
            if s >= at + count {
                self.current.slot = Slot::from_index(s - count);
            } else if s >= at {
                self.current = CurrentCell::none();
            }
        }
    }

    // ========================================================================
    // Collection changes
    // ========================================================================

    /// React to a change in the backing collection. Single-row changes take
    /// the incremental path only while the view is plain (no sort, filter,
    /// or grouping); otherwise the change invalidates the whole projection
    /// and the grid rebuilds.
    pub fn handle_collection_change(&mut self, change: CollectionChange) {
        let plain =
            self.sorts.is_empty() && self.filters.is_empty() && self.grouping.is_none();

        match change {
            CollectionChange::Reset => self.refresh(),
            // Any active sort, filter, or grouping makes a single-row change
            // invalidate the whole projection
            _ if !plain => self.refresh(),
            CollectionChange::Add { row } => {
                self.view.insert_row(row);
                self.row_order = self.view.visible_rows().to_vec();
                // Plain view: slot == row index
                let _ = self.insert_slot(row, 1);
            }
            CollectionChange::Remove { row } => {
                if self.editing_data_row() == Some(row) {
                    self.cancel_edit(EditingUnit::Row, true);
                }
                self.view.remove_row(row);
                self.row_order = self.view.visible_rows().to_vec();
                let _ = self.remove_slot(row, 1);
            }
            CollectionChange::Replace { row } => {
                if let Some(slot) = self.slots.slot_from_row_index(row) {
                    self.refresh_slot(slot);
                }
            }
            CollectionChange::Move { from, to } => {
                self.view.remove_row(from);
                self.view.insert_row(to);
                self.row_order = self.view.visible_rows().to_vec();
                let _ = self.remove_slot(from, 1);
                let _ = self.insert_slot(to, 1);
            }
        }
    }

    fn refresh_slot(&mut self, slot: Slot) {
        let Some(id) = self.display.element_at_slot(slot) else {
            return;
        };
        if let Some(data_row) = self.data_row_from_slot(slot) {
            if let Some(item) = self.source.get(data_row) {
                refresh_row(&mut self.arena, &self.columns, item, id);
            }
        }
    }

    fn editing_data_row(&self) -> Option<usize> {
        self.edit_state.editing_slot().and_then(|slot| self.data_row_from_slot(slot))
    }

    // ========================================================================
    // Current cell
    // ========================================================================

    /// Move keyboard focus. An open edit on another slot is committed
    /// first; a failed commit keeps focus where it was and returns false.
    pub fn set_current_cell(&mut self, slot: Slot, column_index: Option<usize>) -> bool {
        if !slot.is_none() && !self.slots.contains(slot) {
            return false;
        }
        if let Some(col) = column_index {
            if col >= self.columns.len() {
                return false;
            }
        }
        let target = CurrentCell { slot, column_index };
        if target == self.current {
            return true;
        }

        if self.edit_state.is_editing() && self.edit_state.editing_slot() != Some(slot) {
            if !self.commit_edit(EditingUnit::Row, true) {
                return false;
            }
        }

        self.current = target;
        self.events.emit(GridEvent::CurrentCellChanged { slot, column_index });
        true
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Enter cell edit mode on the current cell. Returns false when there
    /// is no current cell, the slot is a group header, the column is
    /// read-only, or a subscriber vetoed.
    pub fn begin_edit(&mut self) -> bool {
        let CurrentCell { slot, column_index: Some(column_index) } = self.current else {
            return false;
        };
        if self.slots.is_header(slot) || !self.slots.contains(slot) {
            return false;
        }
        match self.edit_state {
            EditState::CellEditing { .. } => return false,
            // The open row transaction pins cell edits to its own slot
            EditState::RowEditing { slot: editing } if editing != slot => return false,
            _ => {}
        }
        let read_only = match self.columns.get(column_index) {
            Some(column) => column.is_effectively_read_only(),
            None => return false,
        };
        if read_only {
            return false;
        }
        let Some(data_row) = self.data_row_from_slot(slot) else {
            return false;
        };
        if !self.scroll_into_view(slot) {
            return false;
        }

        let before = self.current;
        if !self.events.emit(GridEvent::BeginningEdit { slot, column_index }) {
            return false;
        }
        if self.current != before {
            return false;
        }

        if self.edit_state == EditState::Idle {
            self.source.begin_item_edit(data_row);
        }

        let Some(id) = self.display.element_at_slot(slot) else {
            return false;
        };
        if let Some(row) = self.arena.get_mut(id).and_then(GridElement::as_row_mut) {
            row.is_editing = true;
            if let Some(cell) = row.cell_mut(column_index) {
                cell.pre_edit_value = Some(cell.value.clone());
            }
        }

        self.edit_state = EditState::CellEditing { slot, column_index };
        log::trace!("begin edit at slot {slot}, column {column_index}");
        true
    }

    /// Stage a new value into the editing cell. The source is untouched
    /// until commit.
    pub fn set_editor_value(&mut self, value: Value) -> bool {
        let EditState::CellEditing { slot, column_index } = self.edit_state else {
            return false;
        };
        let Some(id) = self.display.element_at_slot(slot) else {
            return false;
        };
        let display = match self.columns.get(column_index) {
            Some(column) => column.display_value(&value),
            None => return false,
        };
        if let Some(cell) = self
            .arena
            .get_mut(id)
            .and_then(GridElement::as_row_mut)
            .and_then(|row| row.cell_mut(column_index))
        {
            cell.value = value;
            cell.display = display;
            return true;
        }
        false
    }

    /// Commit the edit at the given scope. Cell scope pushes the staged
    /// value through the accessor and drops back to row editing; row scope
    /// additionally finalizes the source transaction. On a validation
    /// failure the cell and row are marked invalid, edit mode is kept, and
    /// false is returned with the source unchanged.
    pub fn commit_edit(&mut self, unit: EditingUnit, exit_edit_mode: bool) -> bool {
        if !self.edit_state.is_editing() {
            return false;
        }
        let cell_position = match self.edit_state {
            EditState::CellEditing { slot, column_index } => Some((slot, column_index)),
            _ => None,
        };
        if !self.commit_cell_part() {
            return false;
        }
        if unit == EditingUnit::Cell {
            if !exit_edit_mode {
                // Keep the editor open on the freshly committed value
                if let Some((slot, column_index)) = cell_position {
                    self.edit_state = EditState::CellEditing { slot, column_index };
                    if let Some(cell) = self
                        .display
                        .element_at_slot(slot)
                        .and_then(|id| self.arena.get_mut(id))
                        .and_then(GridElement::as_row_mut)
                        .and_then(|row| row.cell_mut(column_index))
                    {
                        cell.pre_edit_value = Some(cell.value.clone());
                    }
                }
            }
            return true;
        }

        let EditState::RowEditing { slot } = self.edit_state else {
            return matches!(self.edit_state, EditState::Idle);
        };
        let before = self.current;
        if !self.events.emit(GridEvent::RowEditEnding { slot, action: EditAction::Commit }) {
            return false;
        }
        if self.current != before {
            return false;
        }

        if let Some(data_row) = self.data_row_from_slot(slot) {
            self.source.commit_item_edit(data_row);
        }
        if let Some(id) = self.display.element_at_slot(slot) {
            if let Some(row) = self.arena.get_mut(id).and_then(GridElement::as_row_mut) {
                row.is_editing = false;
            }
        }
        self.edit_state = EditState::Idle;
        self.refresh_slot(slot);
        self.events.emit(GridEvent::RowEditEnded { slot, action: EditAction::Commit });
        true
    }

    fn commit_cell_part(&mut self) -> bool {
        let EditState::CellEditing { slot, column_index } = self.edit_state else {
            return true;
        };
        let before = self.current;
        if !self.events.emit(GridEvent::CellEditEnding {
            slot,
            column_index,
            action: EditAction::Commit,
        }) {
            return false;
        }
        if self.current != before {
            return false;
        }

        let Some(id) = self.display.element_at_slot(slot) else {
            return false;
        };
        let Some(value) = self
            .arena
            .get(id)
            .and_then(GridElement::as_row)
            .and_then(|row| row.cell(column_index))
            .map(|cell| cell.value.clone())
        else {
            return false;
        };
        let Some(data_row) = self.data_row_from_slot(slot) else {
            return false;
        };

        let outcome = match (self.columns.get(column_index), self.source.get_mut(data_row)) {
            (Some(column), Some(item)) => column.set_value(item, value),
            _ => return false,
        };

        if let Err(error) = outcome {
            if let Some(row) = self.arena.get_mut(id).and_then(GridElement::as_row_mut) {
                row.is_valid = false;
                if let Some(cell) = row.cell_mut(column_index) {
                    cell.is_valid = false;
                    cell.error = Some(error.to_string());
                }
            }
            log::debug!("commit rejected at slot {slot}, column {column_index}: {error}");
            return false;
        }

        if let Some(row) = self.arena.get_mut(id).and_then(GridElement::as_row_mut) {
            row.is_valid = true;
            if let Some(cell) = row.cell_mut(column_index) {
                cell.is_valid = true;
                cell.error = None;
                cell.pre_edit_value = None;
            }
        }
        self.edit_state = EditState::RowEditing { slot };
        self.events.emit(GridEvent::CellEditEnded {
            slot,
            column_index,
            action: EditAction::Commit,
        });
        true
    }

    /// Abandon the edit at the given scope, restoring pre-edit values.
    /// Row scope rolls the source item back; when the source cannot roll
    /// back, the cancel is refused unless `force` is set.
    pub fn cancel_edit(&mut self, unit: EditingUnit, force: bool) -> bool {
        if !self.edit_state.is_editing() {
            return false;
        }

        if let EditState::CellEditing { slot, column_index } = self.edit_state {
            let before = self.current;
            if !self.events.emit(GridEvent::CellEditEnding {
                slot,
                column_index,
                action: EditAction::Cancel,
            }) && !force
            {
                return false;
            }
            if self.current != before && !force {
                return false;
            }
            self.restore_pre_edit(slot, column_index);
            self.edit_state = EditState::RowEditing { slot };
            self.events.emit(GridEvent::CellEditEnded {
                slot,
                column_index,
                action: EditAction::Cancel,
            });
            if unit == EditingUnit::Cell {
                return true;
            }
        }

        let EditState::RowEditing { slot } = self.edit_state else {
            return false;
        };
        let before = self.current;
        if !self.events.emit(GridEvent::RowEditEnding { slot, action: EditAction::Cancel })
            && !force
        {
            return false;
        }
        if self.current != before && !force {
            return false;
        }

        if let Some(data_row) = self.data_row_from_slot(slot) {
            let rolled_back = self.source.cancel_item_edit(data_row);
            if !rolled_back && !force {
                return false;
            }
        }
        if let Some(id) = self.display.element_at_slot(slot) {
            if let Some(row) = self.arena.get_mut(id).and_then(GridElement::as_row_mut) {
                row.is_editing = false;
            }
        }
        self.edit_state = EditState::Idle;
        self.refresh_slot(slot);
        self.events.emit(GridEvent::RowEditEnded { slot, action: EditAction::Cancel });
        true
    }

    fn restore_pre_edit(&mut self, slot: Slot, column_index: usize) {
        let Some(id) = self.display.element_at_slot(slot) else {
            return;
        };
        let display_of = |column: Option<&GridColumn<T>>, value: &Value| match column {
            Some(column) => column.display_value(value),
            None => value.display(),
        };
        let column = self.columns.get(column_index);
        if let Some(cell) = self
            .arena
            .get_mut(id)
            .and_then(GridElement::as_row_mut)
            .and_then(|row| row.cell_mut(column_index))
        {
            if let Some(previous) = cell.pre_edit_value.take() {
                cell.display = display_of(column, &previous);
                cell.value = previous;
            }
            cell.is_valid = true;
            cell.error = None;
        }
    }

    // ========================================================================
    // Grouping
    // ========================================================================

    /// Collapse the group under a header slot. Row indices are unaffected;
    /// the group's data slots just stop being visible. An open edit inside
    /// the group is committed first.
    pub fn collapse_group(&mut self, slot: Slot) -> bool {
        let Some(header) = slot.index().filter(|&s| self.slots.headers.is_header(s)) else {
            return false;
        };
        let Some(info) = self.slots.headers.get(header) else {
            return false;
        };
        if info.row_count == 0 {
            return false;
        }
        let (start, end) = (header + 1, header + info.row_count);
        if self.slots.collapsed.contains(start) {
            return false;
        }

        if let Some(editing) = self.edit_state.editing_slot().and_then(|s| s.index()) {
            if (start..=end).contains(&editing) && !self.commit_edit(EditingUnit::Row, true) {
                return false;
            }
        }
        if let Some(s) = self.current.slot.index() {
            if (start..=end).contains(&s) {
                self.current = CurrentCell { slot, column_index: None };
            }
        }

        self.slots.collapsed.insert_range(start, end);
        if let Some(id) = self.display.element_at_slot(slot) {
            if let Some(GridElement::GroupHeader(h)) = self.arena.get_mut(id) {
                h.collapsed = true;
            }
        }
        let anchor = self.display.first_scrolling_slot();
        let anchor = if anchor.is_none() || self.slots.is_collapsed(anchor) {
            self.slots.first_visible_slot()
        } else {
            anchor
        };
        self.fill_window_from(anchor);
        self.events.emit(GridEvent::GroupCollapsed { slot: header });
        true
    }

    /// Re-show a collapsed group's rows.
    pub fn expand_group(&mut self, slot: Slot) -> bool {
        let Some(header) = slot.index().filter(|&s| self.slots.headers.is_header(s)) else {
            return false;
        };
        let Some(info) = self.slots.headers.get(header) else {
            return false;
        };
        let (start, end) = (header + 1, header + info.row_count);
        if info.row_count == 0 || !self.slots.collapsed.contains(start) {
            return false;
        }

        self.slots.collapsed.remove_range(start, end);
        if let Some(id) = self.display.element_at_slot(slot) {
            if let Some(GridElement::GroupHeader(h)) = self.arena.get_mut(id) {
                h.collapsed = false;
            }
        }
        let anchor = self.display.first_scrolling_slot();
        let anchor = if anchor.is_none() { self.slots.first_visible_slot() } else { anchor };
        self.fill_window_from(anchor);
        self.events.emit(GridEvent::GroupExpanded { slot: header });
        true
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Snapshot every visible row for the clipboard renderers. Columns
    /// follow display order, hidden columns are skipped, headers come from
    /// the column captions.
    pub fn export_all(&self) -> ExportContext {
        let rows: Vec<usize> = self.row_order.clone();
        self.export_rows(&rows)
    }

    /// Snapshot a contiguous slot range (group headers and collapsed slots
    /// are skipped).
    pub fn export_slots(&self, from: Slot, to: Slot) -> ExportContext {
        let (Some(from), Some(to)) = (from.index(), to.index()) else {
            return self.export_rows(&[]);
        };
        let rows: Vec<usize> = (from..=to.min(self.slots.slot_count().saturating_sub(1)))
            .filter(|&s| !self.slots.collapsed.contains(s))
            .filter_map(|s| self.data_row_from_slot(Slot::from_index(s)))
            .collect();
        self.export_rows(&rows)
    }

    fn export_rows(&self, data_rows: &[usize]) -> ExportContext {
        let visible = self.columns.visible_indices();
        let headers: Vec<String> = visible
            .iter()
            .filter_map(|&i| self.columns.get(i).map(|c| c.header.clone()))
            .collect();
        let rows: Vec<Vec<Value>> = data_rows
            .iter()
            .filter_map(|&row| self.source.get(row))
            .map(|item| {
                visible
                    .iter()
                    .filter_map(|&i| self.columns.get(i).map(|c| c.get_value(item)))
                    .collect()
            })
            .collect();
        ExportContext::new(headers, rows, self.settings.copy_mode.includes_header())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::VecSource;
    use gridkit_core::FieldAccessor;

    #[derive(Clone)]
    struct Item {
        name: String,
        qty: f64,
    }

    fn item(name: &str, qty: f64) -> Item {
        Item { name: name.into(), qty }
    }

    fn grid_with(items: Vec<Item>) -> DataGrid<Item> {
        let mut grid = DataGrid::new(VecSource::new(items), GridSettings::default());
        grid.add_column(GridColumn::new(
            "Name",
            FieldAccessor::new(
                |i: &Item| Value::Text(i.name.clone()),
                |i: &mut Item, v| {
                    i.name = v.display();
                    Ok(())
                },
            ),
        ));
        grid.add_column(GridColumn::new(
            "Qty",
            FieldAccessor::read_only(|i: &Item| Value::Number(i.qty)),
        ));
        grid.refresh();
        grid
    }

    #[test]
    fn test_refresh_builds_slots_and_window() {
        let grid = grid_with(vec![item("a", 1.0), item("b", 2.0), item("c", 3.0)]);
        assert_eq!(grid.slot_count(), 3);
        assert_eq!(grid.num_displayed_scrolling_elements(), 3);
        let row = grid.row_at_slot(Slot(1)).unwrap();
        assert_eq!(row.cells[0].value, Value::Text("b".into()));
    }

    #[test]
    fn test_sorted_grid_maps_slots_to_data() {
        let mut grid = grid_with(vec![item("b", 1.0), item("a", 2.0)]);
        let name_col = grid.columns().get(0).map(|c| c.id).unwrap();
        grid.sorts.add(SortDescriptor::ascending(name_col));
        grid.refresh();

        assert_eq!(grid.data_row_from_slot(Slot(0)), Some(1)); // "a"
        assert_eq!(grid.data_row_from_slot(Slot(1)), Some(0));
    }

    #[test]
    fn test_grouping_interleaves_headers() {
        let mut grid = grid_with(vec![item("x", 1.0), item("y", 1.0), item("z", 2.0)]);
        grid.set_group_description(GroupDescription::new(|i: &Item| Value::Number(i.qty)));
        grid.refresh();

        // [H(1), x, y, H(2), z]
        assert_eq!(grid.slot_count(), 5);
        assert!(grid.is_group_header(Slot(0)));
        assert!(grid.is_group_header(Slot(3)));
        assert_eq!(grid.row_index_from_slot(Slot(4)), Some(2));
        assert_eq!(grid.data_row_from_slot(Slot(4)), Some(2));
    }

    #[test]
    fn test_collapse_hides_but_preserves_indices() {
        let mut grid = grid_with(vec![item("x", 1.0), item("y", 1.0), item("z", 2.0)]);
        grid.set_group_description(GroupDescription::new(|i: &Item| Value::Number(i.qty)));
        grid.refresh();

        assert!(grid.collapse_group(Slot(0)));
        assert!(grid.is_slot_collapsed(Slot(1)));
        assert!(!grid.is_slot_visible(Slot(1)));
        // Numbering unchanged
        assert_eq!(grid.row_index_from_slot(Slot(1)), Some(0));
        assert_eq!(grid.next_visible_slot(Slot(0)), Slot(3));

        assert!(grid.expand_group(Slot(0)));
        assert!(!grid.is_slot_collapsed(Slot(1)));
    }

    #[test]
    fn test_collection_add_remove_plain_path() {
        let mut grid = grid_with(vec![item("a", 1.0), item("b", 2.0)]);
        grid.handle_collection_change(CollectionChange::Add { row: 1 });
        assert_eq!(grid.slot_count(), 3);

        grid.handle_collection_change(CollectionChange::Remove { row: 0 });
        assert_eq!(grid.slot_count(), 2);
    }

    #[test]
    fn test_current_cell_rejects_out_of_range() {
        let mut grid = grid_with(vec![item("a", 1.0)]);
        assert!(!grid.set_current_cell(Slot(5), Some(0)));
        assert!(!grid.set_current_cell(Slot(0), Some(9)));
        assert!(grid.set_current_cell(Slot(0), Some(0)));
        assert_eq!(grid.current_cell(), CurrentCell::at(Slot(0), 0));
    }

    #[test]
    fn test_edit_commit_round_trip() {
        let mut grid = grid_with(vec![item("a", 1.0)]);
        assert!(grid.set_current_cell(Slot(0), Some(0)));
        assert!(grid.begin_edit());
        assert!(grid.set_editor_value(Value::Text("renamed".into())));
        assert!(grid.commit_edit(EditingUnit::Row, true));
        assert_eq!(grid.edit_state(), EditState::Idle);
        assert_eq!(
            grid.source().get(0).map(|i| i.name.clone()),
            Some("renamed".to_string())
        );
    }

    #[test]
    fn test_begin_edit_rejects_read_only_column() {
        let mut grid = grid_with(vec![item("a", 1.0)]);
        assert!(grid.set_current_cell(Slot(0), Some(1)));
        assert!(!grid.begin_edit());
    }

    #[test]
    fn test_export_all_follows_view_order() {
        let mut grid = grid_with(vec![item("b", 2.0), item("a", 1.0)]);
        let name_col = grid.columns().get(0).map(|c| c.id).unwrap();
        grid.sorts.add(SortDescriptor::ascending(name_col));
        grid.refresh();

        let ctx = grid.export_all();
        assert_eq!(ctx.headers, vec!["Name", "Qty"]);
        assert_eq!(ctx.rows[0][0], Value::Text("a".into()));
        assert_eq!(ctx.rows[1][0], Value::Text("b".into()));
    }

    #[test]
    fn test_scrolling_recycles_elements() {
        let mut grid = grid_with((0..100).map(|i| item(&format!("r{i}"), i as f64)).collect());
        grid.set_viewport_height(GridSettings::default().row_height * 5.0);
        grid.refresh();
        assert_eq!(grid.live_element_count(), 5);

        // Jumping down re-anchors; displaced elements are reused
        assert!(grid.scroll_into_view(Slot(80)));
        assert_eq!(grid.live_element_count(), 5);

        // Scrolling back up cycles elements through the pools
        assert!(grid.scroll_into_view(Slot(0)));
        assert!(grid.row_at_slot(Slot(0)).is_some());
        assert!(grid.live_element_count() <= 6);
    }

    #[test]
    fn test_cell_value_query_errors() {
        let grid = grid_with(vec![item("a", 1.5)]);
        assert_eq!(grid.cell_value(Slot(0), 1), Ok(Value::Number(1.5)));
        assert_eq!(
            grid.cell_value(Slot(0), 9),
            Err(GridError::ColumnOutOfRange { index: 9, count: 2 })
        );
        assert_eq!(
            grid.cell_value(Slot(5), 0),
            Err(GridError::SlotOutOfRange { slot: 5, count: 1 })
        );
    }

    #[test]
    fn test_position_queries_report_state() {
        let mut grid = grid_with(vec![item("a", 1.0)]);
        assert_eq!(grid.current_cell_position(), Err(GridError::NoCurrentCell));
        assert_eq!(grid.editing_cell(), Err(GridError::NotEditing));

        grid.set_current_cell(Slot(0), Some(0));
        assert_eq!(grid.current_cell_position(), Ok((Slot(0), 0)));

        assert!(grid.begin_edit());
        assert_eq!(grid.editing_cell(), Ok((Slot(0), 0)));
    }

    #[test]
    fn test_scroll_into_view_reanchors() {
        let mut grid = grid_with((0..100).map(|i| item(&format!("r{i}"), i as f64)).collect());
        grid.set_viewport_height(GridSettings::default().row_height * 5.0);
        grid.refresh();
        assert!(grid.row_at_slot(Slot(80)).is_none());

        assert!(grid.scroll_into_view(Slot(80)));
        assert!(grid.row_at_slot(Slot(80)).is_some());
    }
}
