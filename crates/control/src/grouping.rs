//! Row grouping.
//!
//! A group description extracts a key per item; `build_groups` partitions
//! the view's visible rows into ordered groups. The grid turns the result
//! into header slots interleaved with data slots. Grouping never reorders
//! data rows within a group.

use gridkit_core::Value;

use crate::collection::RowsSource;
use crate::row_view::RowView;

/// How to group: a key per item, plus whether to sort group keys.
pub struct GroupDescription<T> {
    key: Box<dyn Fn(&T) -> Value>,
    pub sort_keys: bool,
}

impl<T> GroupDescription<T> {
    pub fn new(key: impl Fn(&T) -> Value + 'static) -> Self {
        Self { key: Box::new(key), sort_keys: true }
    }

    pub fn unsorted(mut self) -> Self {
        self.sort_keys = false;
        self
    }

    pub fn key_for(&self, item: &T) -> Value {
        (self.key)(item)
    }
}

/// One computed group: the shared key and the member data rows, in view
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Value,
    pub rows: Vec<usize>,
}

/// Partition the view's visible rows by key. Groups appear in
/// first-encounter order, or sorted by key when the description asks.
/// Rows inside a group keep their view order.
pub fn build_groups<T>(
    source: &dyn RowsSource<T>,
    view: &RowView,
    description: &GroupDescription<T>,
) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();

    for &data_row in view.visible_rows() {
        let Some(item) = source.get(data_row) else {
            continue;
        };
        let key = description.key_for(item);
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.rows.push(data_row),
            None => groups.push(Group { key, rows: vec![data_row] }),
        }
    }

    if description.sort_keys {
        groups.sort_by(|a, b| a.key.cmp(&b.key));
    }
    groups
}
