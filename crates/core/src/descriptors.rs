//! Sort, filter and search descriptor models.
//!
//! Descriptors are immutable value objects describing what the user asked
//! for; the control compiles them into permutations, visibility masks and
//! hit lists. A `DescriptorSet` holds an ordered list plus change
//! subscribers so adapters can react without polling.
//!
//! ## Case sensitivity
//!
//! - Filter string operators (Contains/StartsWith/EndsWith): case-insensitive.
//! - Search match modes: case sensitivity is explicit per descriptor.

use serde::{Deserialize, Serialize};

use crate::value::Value;
use crate::ColumnId;

// ============================================================================
// Sort
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(&self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// One sort key. Multiple descriptors form a multi-key sort, first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub column: ColumnId,
    pub direction: SortDirection,
}

impl SortDescriptor {
    pub fn ascending(column: ColumnId) -> Self {
        Self { column, direction: SortDirection::Ascending }
    }

    pub fn descending(column: ColumnId) -> Self {
        Self { column, direction: SortDirection::Descending }
    }
}

// ============================================================================
// Filter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    IsEmpty,
    IsNotEmpty,
}

impl FilterOp {
    /// Apply the operator. String operators match on display text,
    /// case-insensitively. Relational operators use the value total order.
    pub fn matches(&self, actual: &Value, operand: &Value) -> bool {
        match self {
            Self::Equals => actual == operand,
            Self::NotEquals => actual != operand,
            Self::Contains => fold(actual).contains(&fold(operand)),
            Self::StartsWith => fold(actual).starts_with(&fold(operand)),
            Self::EndsWith => fold(actual).ends_with(&fold(operand)),
            Self::GreaterThan => actual > operand,
            Self::LessThan => actual < operand,
            Self::GreaterOrEqual => actual >= operand,
            Self::LessOrEqual => actual <= operand,
            Self::IsEmpty => actual.is_empty(),
            Self::IsNotEmpty => !actual.is_empty(),
        }
    }
}

fn fold(v: &Value) -> String {
    v.display().to_lowercase()
}

/// One column-level filter condition. Multiple descriptors AND together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub column: ColumnId,
    pub op: FilterOp,
    /// Ignored by `IsEmpty`/`IsNotEmpty`.
    pub operand: Value,
}

impl FilterDescriptor {
    pub fn new(column: ColumnId, op: FilterOp, operand: Value) -> Self {
        Self { column, op, operand }
    }

    pub fn matches(&self, actual: &Value) -> bool {
        self.op.matches(actual, &self.operand)
    }
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MatchMode {
    Contains { case_sensitive: bool },
    StartsWith { case_sensitive: bool },
    Exact { case_sensitive: bool },
}

impl Default for MatchMode {
    fn default() -> Self {
        MatchMode::Contains { case_sensitive: false }
    }
}

impl MatchMode {
    fn case_sensitive(&self) -> bool {
        match self {
            Self::Contains { case_sensitive }
            | Self::StartsWith { case_sensitive }
            | Self::Exact { case_sensitive } => *case_sensitive,
        }
    }

    pub fn matches(&self, haystack: &str, query: &str) -> bool {
        let (haystack, query) = if self.case_sensitive() {
            (haystack.to_string(), query.to_string())
        } else {
            (haystack.to_lowercase(), query.to_lowercase())
        };
        match self {
            Self::Contains { .. } => haystack.contains(&query),
            Self::StartsWith { .. } => haystack.starts_with(&query),
            Self::Exact { .. } => haystack == query,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    #[default]
    AllColumns,
    VisibleColumns,
    /// Only the columns listed in `SearchDescriptor::columns`.
    SelectedColumns,
}

/// A search request: query text plus how and where to match it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchDescriptor {
    pub query: String,
    pub mode: MatchMode,
    pub scope: SearchScope,
    /// Column list consulted when scope is `SelectedColumns`.
    pub columns: Vec<ColumnId>,
}

impl SearchDescriptor {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Default::default() }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnId>) -> Self {
        self.columns = columns;
        self.scope = SearchScope::SelectedColumns;
        self
    }

    /// Does this descriptor search the given column?
    pub fn covers_column(&self, column: ColumnId, column_visible: bool) -> bool {
        match self.scope {
            SearchScope::AllColumns => true,
            SearchScope::VisibleColumns => column_visible,
            SearchScope::SelectedColumns => self.columns.contains(&column),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        !self.query.is_empty() && self.mode.matches(&value.display(), &self.query)
    }
}

// ============================================================================
// Descriptor sets with change notification
// ============================================================================

/// What changed in a descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorChange {
    /// Descriptor appended at index.
    Added(usize),
    /// Descriptor removed from index.
    Removed(usize),
    /// All descriptors removed.
    Cleared,
    /// Whole list swapped out.
    Replaced,
}

type ChangeCallback = Box<dyn FnMut(DescriptorChange)>;

/// Ordered descriptor list with change subscribers.
///
/// Subscribers run synchronously after the mutation; re-entrant mutation from
/// inside a callback is the caller's responsibility (single-threaded model).
#[derive(Default)]
pub struct DescriptorSet<D> {
    items: Vec<D>,
    subscribers: Vec<ChangeCallback>,
}

impl<D> DescriptorSet<D> {
    pub fn new() -> Self {
        Self { items: Vec::new(), subscribers: Vec::new() }
    }

    pub fn items(&self) -> &[D] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(DescriptorChange) + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    fn notify(&mut self, change: DescriptorChange) {
        for sub in &mut self.subscribers {
            sub(change);
        }
    }

    pub fn add(&mut self, descriptor: D) {
        self.items.push(descriptor);
        self.notify(DescriptorChange::Added(self.items.len() - 1));
    }

    /// Remove by index. Returns the descriptor if the index was valid.
    pub fn remove(&mut self, index: usize) -> Option<D> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.notify(DescriptorChange::Removed(index));
        Some(removed)
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.notify(DescriptorChange::Cleared);
    }

    pub fn replace(&mut self, items: Vec<D>) {
        self.items = items;
        self.notify(DescriptorChange::Replaced);
    }
}
