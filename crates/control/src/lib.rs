//! Virtualized data-grid control model.
//!
//! The control is UI-framework-agnostic: it owns slot bookkeeping, the
//! sort/filter/group projection, the realized element window, and the edit
//! state machine, and exposes them to a host through plain calls and
//! synchronous events.

pub mod collection;
pub mod columns;
pub mod display;
pub mod editing;
pub mod error;
pub mod events;
pub mod grid;
pub mod grouping;
pub mod row_view;
pub mod rows;
pub mod slot_table;
pub mod slots;

pub use collection::{CollectionChange, RowsSource, VecSource};
pub use columns::{ColumnCollection, GridColumn, Visibility};
pub use display::DisplayData;
pub use editing::{CurrentCell, EditState, EditingUnit};
pub use error::GridError;
pub use events::{EditAction, EventArgs, EventHub, GridEvent};
pub use grid::DataGrid;
pub use grouping::{build_groups, Group, GroupDescription};
pub use row_view::RowView;
pub use rows::{ElementArena, ElementId, GridCell, GridElement, GridRow, GroupHeaderRow};
pub use slot_table::{CollapsedSlotsTable, GroupInfo, RangeSet, RowGroupHeadersTable};
pub use slots::{Slot, SlotSpace};
