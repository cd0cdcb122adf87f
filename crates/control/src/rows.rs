//! Realized row and group-header elements.
//!
//! Ownership is arena+index: the grid owns an `ElementArena`, rows and
//! cells refer to each other by id and index, never by reference. Cells
//! carry a back-reference to their owning row and column index; structural
//! consistency is checked with debug assertions when elements are built.

use gridkit_core::Value;

use crate::columns::ColumnCollection;
use crate::slot_table::GroupInfo;
use crate::slots::Slot;

/// Index into the element arena. Ids are stable until the element is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u32);

/// One realized cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub owning_row: ElementId,
    pub column_index: usize,
    pub value: Value,
    pub display: String,
    pub is_valid: bool,
    /// Validation message attached on a failed commit.
    pub error: Option<String>,
    /// Cached for rollback while the cell is in edit.
    pub pre_edit_value: Option<Value>,
}

/// One realized data row.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub slot: Slot,
    pub row_index: usize,
    pub cells: Vec<GridCell>,
    pub is_valid: bool,
    pub is_editing: bool,
}

impl GridRow {
    pub fn cell(&self, column_index: usize) -> Option<&GridCell> {
        self.cells.get(column_index)
    }

    pub fn cell_mut(&mut self, column_index: usize) -> Option<&mut GridCell> {
        self.cells.get_mut(column_index)
    }

    /// Clear validation decoration on the row and all cells.
    pub fn clear_validation(&mut self) {
        self.is_valid = true;
        for cell in &mut self.cells {
            cell.is_valid = true;
            cell.error = None;
        }
    }
}

/// One realized group-header element.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupHeaderRow {
    pub slot: Slot,
    pub info: GroupInfo,
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridElement {
    Row(GridRow),
    GroupHeader(GroupHeaderRow),
}

impl GridElement {
    pub fn slot(&self) -> Slot {
        match self {
            Self::Row(row) => row.slot,
            Self::GroupHeader(header) => header.slot,
        }
    }

    pub fn set_slot(&mut self, slot: Slot) {
        match self {
            Self::Row(row) => row.slot = slot,
            Self::GroupHeader(header) => header.slot = slot,
        }
    }

    pub fn as_row(&self) -> Option<&GridRow> {
        match self {
            Self::Row(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_row_mut(&mut self) -> Option<&mut GridRow> {
        match self {
            Self::Row(row) => Some(row),
            _ => None,
        }
    }
}

/// Slab-style arena: freed slots are reused, ids index the backing vec.
#[derive(Debug, Default)]
pub struct ElementArena {
    elements: Vec<Option<GridElement>>,
    free: Vec<u32>,
}

impl ElementArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, element: GridElement) -> ElementId {
        match self.free.pop() {
            Some(index) => {
                self.elements[index as usize] = Some(element);
                ElementId(index)
            }
            None => {
                self.elements.push(Some(element));
                ElementId(self.elements.len() as u32 - 1)
            }
        }
    }

    pub fn get(&self, id: ElementId) -> Option<&GridElement> {
        self.elements.get(id.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut GridElement> {
        self.elements.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn free(&mut self, id: ElementId) -> Option<GridElement> {
        let slot = self.elements.get_mut(id.0 as usize)?;
        let element = slot.take();
        if element.is_some() {
            self.free.push(id.0);
        }
        element
    }

    pub fn live_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.free.clear();
    }
}

/// Build a realized data row: one cell per column, values read through the
/// column accessors.
pub fn generate_row<T>(
    arena: &mut ElementArena,
    columns: &ColumnCollection<T>,
    item: &T,
    row_index: usize,
    slot: Slot,
) -> ElementId {
    let id = arena.alloc(GridElement::Row(GridRow {
        slot,
        row_index,
        cells: Vec::with_capacity(columns.len()),
        is_valid: true,
        is_editing: false,
    }));

    let mut cells = Vec::with_capacity(columns.len());
    for (column_index, column) in columns.iter().enumerate() {
        let value = column.get_value(item);
        let display = column.display_value(&value);
        cells.push(GridCell {
            owning_row: id,
            column_index,
            value,
            display,
            is_valid: true,
            error: None,
            pre_edit_value: None,
        });
    }

    if let Some(GridElement::Row(row)) = arena.get_mut(id) {
        row.cells = cells;
        debug_assert_eq!(row.cells.len(), columns.len());
        debug_assert!(row
            .cells
            .iter()
            .enumerate()
            .all(|(i, c)| c.column_index == i && c.owning_row == id));
    }

    id
}

/// Refresh an existing row element in place from the current item state.
pub fn refresh_row<T>(
    arena: &mut ElementArena,
    columns: &ColumnCollection<T>,
    item: &T,
    id: ElementId,
) {
    let Some(GridElement::Row(row)) = arena.get_mut(id) else {
        return;
    };
    debug_assert_eq!(row.cells.len(), columns.len());
    for (cell, column) in row.cells.iter_mut().zip(columns.iter()) {
        cell.value = column.get_value(item);
        cell.display = column.display_value(&cell.value);
        cell.is_valid = true;
        cell.error = None;
        cell.pre_edit_value = None;
    }
    row.is_valid = true;
}

/// Build a realized group-header element.
pub fn generate_group_header(
    arena: &mut ElementArena,
    slot: Slot,
    info: GroupInfo,
    collapsed: bool,
) -> ElementId {
    arena.alloc(GridElement::GroupHeader(GroupHeaderRow { slot, info, collapsed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::GridColumn;
    use gridkit_core::FieldAccessor;

    struct Item {
        name: String,
        score: f64,
    }

    fn columns() -> ColumnCollection<Item> {
        let mut cols = ColumnCollection::new();
        cols.add(GridColumn::new(
            "Name",
            FieldAccessor::read_only(|i: &Item| Value::Text(i.name.clone())),
        ));
        cols.add(GridColumn::new(
            "Score",
            FieldAccessor::read_only(|i: &Item| Value::Number(i.score)),
        ));
        cols
    }

    #[test]
    fn test_generate_row_populates_cells() {
        let mut arena = ElementArena::new();
        let cols = columns();
        let item = Item { name: "Ada".into(), score: 3.5 };

        let id = generate_row(&mut arena, &cols, &item, 0, Slot(0));
        let row = arena.get(id).and_then(GridElement::as_row).unwrap();
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.cells[0].value, Value::Text("Ada".into()));
        assert_eq!(row.cells[1].value, Value::Number(3.5));
        assert!(row.cells.iter().all(|c| c.owning_row == id));
    }

    #[test]
    fn test_arena_reuses_freed_ids() {
        let mut arena = ElementArena::new();
        let cols = columns();
        let item = Item { name: "x".into(), score: 0.0 };

        let a = generate_row(&mut arena, &cols, &item, 0, Slot(0));
        arena.free(a);
        let b = generate_row(&mut arena, &cols, &item, 1, Slot(1));
        assert_eq!(a, b);
        assert_eq!(arena.live_count(), 1);
    }

    #[test]
    fn test_double_free_is_inert() {
        let mut arena = ElementArena::new();
        let id = generate_group_header(
            &mut arena,
            Slot(0),
            GroupInfo { key: Value::Empty, row_count: 0 },
            false,
        );
        assert!(arena.free(id).is_some());
        assert!(arena.free(id).is_none());
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn test_refresh_row_clears_validation() {
        let mut arena = ElementArena::new();
        let cols = columns();
        let mut item = Item { name: "Ada".into(), score: 1.0 };

        let id = generate_row(&mut arena, &cols, &item, 0, Slot(0));
        if let Some(row) = arena.get_mut(id).and_then(GridElement::as_row_mut) {
            row.is_valid = false;
            row.cells[0].is_valid = false;
            row.cells[0].error = Some("bad".into());
        }

        item.score = 2.0;
        refresh_row(&mut arena, &cols, &item, id);
        let row = arena.get(id).and_then(GridElement::as_row).unwrap();
        assert!(row.is_valid);
        assert!(row.cells[0].is_valid);
        assert_eq!(row.cells[1].value, Value::Number(2.0));
    }
}
