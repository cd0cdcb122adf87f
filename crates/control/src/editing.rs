//! Edit state machine types.
//!
//! The machine: `Idle -> RowEditing -> CellEditing`, unwinding cell-first.
//! Invariant: an editing column implies the editing row is the current
//! row. The grid drives transitions; this module holds the state model.

use crate::slots::Slot;

/// Scope of a commit or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditingUnit {
    Cell,
    Row,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    /// A row edit transaction is open but no cell editor is active.
    RowEditing { slot: Slot },
    /// A cell editor is active inside the row's edit transaction.
    CellEditing { slot: Slot, column_index: usize },
}

impl EditState {
    pub fn is_editing(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn editing_slot(&self) -> Option<Slot> {
        match self {
            Self::Idle => None,
            Self::RowEditing { slot } | Self::CellEditing { slot, .. } => Some(*slot),
        }
    }

    pub fn editing_column(&self) -> Option<usize> {
        match self {
            Self::CellEditing { column_index, .. } => Some(*column_index),
            _ => None,
        }
    }
}

/// Keyboard focus position. A slot with no column is a group-header
/// position; `Slot::NONE` means no current cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentCell {
    pub slot: Slot,
    pub column_index: Option<usize>,
}

impl Default for CurrentCell {
    fn default() -> Self {
        Self::none()
    }
}

impl CurrentCell {
    pub fn none() -> Self {
        Self { slot: Slot::NONE, column_index: None }
    }

    pub fn at(slot: Slot, column_index: usize) -> Self {
        Self { slot, column_index: Some(column_index) }
    }

    pub fn is_none(&self) -> bool {
        self.slot.is_none()
    }
}
