// Core types shared across the grid crates

pub mod accessor;
pub mod conditional;
pub mod descriptors;
pub mod value;

pub use accessor::{ColumnAccessor, EditError, FieldAccessor};
pub use conditional::{Condition, ConditionalFormatting, ConditionalRule, StyleHint};
pub use descriptors::{
    DescriptorChange, DescriptorSet, FilterDescriptor, FilterOp, MatchMode, SearchDescriptor,
    SearchScope, SortDescriptor, SortDirection,
};
pub use value::{NumberFormat, Value};

use serde::{Deserialize, Serialize};

/// Stable identifier for a grid column.
///
/// Ids are assigned by the column collection and never reused within a grid,
/// so descriptors and conditional rules can reference columns across
/// reordering and visibility changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

impl ColumnId {
    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "col{}", self.0)
    }
}
